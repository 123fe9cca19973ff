//! Reading and writing rasters and sample tables

mod native;
mod table;

pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions};
pub use table::write_samples_csv;
