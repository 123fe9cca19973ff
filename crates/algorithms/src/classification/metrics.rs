//! Classification metrics

use glacis_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true samples of this class
    pub support: usize,
}

/// Test-set evaluation of a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// `confusion_matrix[true][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,
    pub per_class: Vec<ClassScore>,
    pub macro_f1: f64,
}

/// Compare predictions with ground truth over `n_classes` classes.
///
/// Undefined ratios (no predictions or no members of a class) count as 0.
pub fn evaluate(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Result<ClassificationMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(Error::SizeMismatch {
            er: y_true.len(),
            ec: 1,
            ar: y_pred.len(),
            ac: 1,
        });
    }
    if y_true.is_empty() {
        return Err(Error::DataAvailability("no test samples to evaluate".into()));
    }
    if let Some(&bad) = y_true.iter().chain(y_pred).find(|&&c| c >= n_classes) {
        return Err(Error::InvalidParameter {
            name: "class",
            value: bad.to_string(),
            reason: format!("outside 0..{}", n_classes),
        });
    }

    let mut cm = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        cm[t][p] += 1;
    }

    let correct: usize = (0..n_classes).map(|c| cm[c][c]).sum();
    let accuracy = correct as f64 / y_true.len() as f64;

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let per_class: Vec<ClassScore> = (0..n_classes)
        .map(|c| {
            let tp = cm[c][c];
            let predicted: usize = (0..n_classes).map(|t| cm[t][c]).sum();
            let support: usize = cm[c].iter().sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassScore {
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let macro_f1 = per_class.iter().map(|s| s.f1).sum::<f64>() / n_classes as f64;

    Ok(ClassificationMetrics {
        accuracy,
        confusion_matrix: cm,
        per_class,
        macro_f1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn known_confusion() {
        let y_true = [0, 0, 1, 1, 2, 2];
        let y_pred = [0, 1, 1, 1, 2, 0];
        let m = evaluate(&y_true, &y_pred, 3).unwrap();

        assert_eq!(m.confusion_matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);
        assert_relative_eq!(m.accuracy, 4.0 / 6.0);
        assert_relative_eq!(m.per_class[1].precision, 2.0 / 3.0);
        assert_relative_eq!(m.per_class[1].recall, 1.0);
        assert_relative_eq!(m.per_class[1].f1, 0.8);
        assert_eq!(m.per_class[2].support, 2);
    }

    #[test]
    fn never_predicted_class_scores_zero() {
        let m = evaluate(&[0, 1, 1], &[0, 0, 0], 2).unwrap();
        assert_eq!(m.per_class[1].precision, 0.0);
        assert_eq!(m.per_class[1].f1, 0.0);
        assert_relative_eq!(m.macro_f1, (0.5 + 0.0) / 2.0);
    }

    #[test]
    fn length_mismatch() {
        assert!(evaluate(&[0, 1], &[0], 2).is_err());
    }
}
