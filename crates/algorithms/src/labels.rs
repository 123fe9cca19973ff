//! Quantile labels for supervised studies
//!
//! A continuous reference quantity (elevation change, LST change) is cut at
//! its empirical quantiles into `k` ordinal classes of near-equal size.

use glacis_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Class labels plus the quantile edges that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantileLabels {
    /// Class in `0..k` for each input value, in input order
    pub labels: Vec<usize>,
    /// `k + 1` non-decreasing edges: min, the first value of bins 1..k, max
    pub edges: Vec<f64>,
}

impl QuantileLabels {
    pub fn n_classes(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// Number of samples in each class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

/// Bin `values` into `k` quantile classes.
///
/// Values are ranked by (value, input index); rank `r` of `n` gets class
/// `floor(r * k / n)`. Every class therefore holds `floor(n/k)` or
/// `ceil(n/k)` samples, and ties are split deterministically.
pub fn quantile_bins(values: &[f64], k: usize) -> Result<QuantileLabels> {
    let n = values.len();
    if k < 2 {
        return Err(Error::InvalidParameter {
            name: "k",
            value: k.to_string(),
            reason: "need at least 2 classes".into(),
        });
    }
    if n < k {
        return Err(Error::InvalidParameter {
            name: "values",
            value: n.to_string(),
            reason: format!("fewer values than the {} requested classes", k),
        });
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "values",
            value: bad.to_string(),
            reason: "label source must be finite".into(),
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]).then(a.cmp(&b)));

    let mut labels = vec![0; n];
    let mut edges = Vec::with_capacity(k + 1);
    edges.push(values[order[0]]);
    let mut current = 0;
    for (rank, &idx) in order.iter().enumerate() {
        let class = rank * k / n;
        if class != current {
            edges.push(values[idx]);
            current = class;
        }
        labels[idx] = class;
    }
    edges.push(values[order[n - 1]]);

    Ok(QuantileLabels { labels, edges })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_are_balanced() {
        for n in [4usize, 7, 10, 33, 101] {
            for k in [2usize, 3, 4] {
                if n < k {
                    continue;
                }
                let values: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64 - 5.0).collect();
                let q = quantile_bins(&values, k).unwrap();
                for c in q.class_counts() {
                    assert!(c == n / k || c == n.div_ceil(k), "n={n} k={k} count={c}");
                }
                assert_eq!(q.edges.len(), k + 1);
                assert!(q.edges.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn labels_follow_value_order() {
        let values = [-30.0, 2.0, -12.0, -1.0, -25.0, 0.5, -8.0, 4.0];
        let q = quantile_bins(&values, 4).unwrap();
        // Largest thinning is class 0, thickening is class 3
        assert_eq!(q.labels, vec![0, 3, 1, 2, 0, 2, 1, 3]);
        assert_eq!(q.edges, vec![-30.0, -12.0, -1.0, 2.0, 4.0]);
    }

    #[test]
    fn constant_values_still_split() {
        let q = quantile_bins(&[1.0; 8], 4).unwrap();
        assert_eq!(q.class_counts(), vec![2, 2, 2, 2]);
        assert!(q.edges.iter().all(|&e| e == 1.0));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(quantile_bins(&[1.0, 2.0], 1).is_err());
        assert!(quantile_bins(&[1.0, 2.0], 3).is_err());
        assert!(quantile_bins(&[1.0, f64::NAN, 3.0], 2).is_err());
    }
}
