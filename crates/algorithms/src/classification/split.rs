//! Stratified train/test split

use glacis_core::{Error, Result};
use rand::seq::SliceRandom;

use super::{n_classes_of, rng_stream};

/// Split sample indices into `(train, test)` preserving class proportions.
///
/// Each class contributes `round(count * test_fraction)` test rows, clamped
/// so both sides keep at least one row of every class. Classes with fewer
/// than two members cannot be split and are a data-availability error.
/// Both index lists are returned sorted.
pub fn stratified_split(y: &[usize], test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::InvalidParameter {
            name: "test_fraction",
            value: test_fraction.to_string(),
            reason: "must be in (0, 1)".into(),
        });
    }

    let n_classes = n_classes_of(y);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &c) in y.iter().enumerate() {
        by_class[c].push(i);
    }

    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();
    for (class, mut members) in by_class.into_iter().enumerate() {
        if members.len() < 2 {
            return Err(Error::DataAvailability(format!(
                "class {} has {} sample(s); at least 2 are needed to split",
                class,
                members.len()
            )));
        }
        let mut rng = rng_stream(seed, class as u64);
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}
