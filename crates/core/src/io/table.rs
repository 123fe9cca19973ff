//! CSV export of sample tables

use std::path::Path;

use crate::error::{Error, Result};
use crate::table::SampleTable;

/// Write a sample table as CSV.
///
/// Columns: `row`, `col`, `lon`, `lat`, every feature, every auxiliary
/// column, then `class` when `classes` is given (one entry per sample).
pub fn write_samples_csv<P: AsRef<Path>>(
    table: &SampleTable,
    classes: Option<&[usize]>,
    path: P,
) -> Result<()> {
    if let Some(c) = classes {
        if c.len() != table.len() {
            return Err(Error::SizeMismatch {
                er: table.len(),
                ec: 1,
                ar: c.len(),
                ac: 1,
            });
        }
    }

    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path.as_ref())?;

    let mut header: Vec<&str> = vec!["row", "col", "lon", "lat"];
    header.extend(table.feature_names().iter().map(String::as_str));
    header.extend(table.auxiliary_names().iter().map(String::as_str));
    if classes.is_some() {
        header.push("class");
    }
    writer.write_record(&header)?;

    for (i, s) in table.samples().iter().enumerate() {
        let mut record = vec![
            s.row.to_string(),
            s.col.to_string(),
            format!("{:.6}", s.x),
            format!("{:.6}", s.y),
        ];
        record.extend(s.features.iter().map(|v| v.to_string()));
        record.extend(s.auxiliary.iter().map(|v| v.to_string()));
        if let Some(c) = classes {
            record.push(c[i].to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
