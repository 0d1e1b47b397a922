//! Per-sample signal intensity filtering with an unmasked backup.

use crate::data::ExpressionMatrix;
use crate::error::{GexError, Result};

/// A masked expression matrix together with its unmasked backup.
///
/// The backup carries the exact pre-filter values and is consulted again
/// after group retention filtering, when union-surviving probes get their
/// masked values restored.
#[derive(Debug, Clone)]
pub struct MaskedExpression {
    /// Values strictly below the sample threshold replaced with NaN.
    pub masked: ExpressionMatrix,
    /// Untouched copy of the pre-filter matrix.
    pub backup: ExpressionMatrix,
}

/// Mask every cell whose value lies strictly below its sample's threshold.
///
/// `expression` is expected on the log2 scale, matching the thresholds from
/// the noise-floor estimator. `thresholds` must hold one value per sample,
/// in column order. Cells at or above the threshold pass unchanged.
pub fn signal_filter(
    expression: &ExpressionMatrix,
    thresholds: &[f64],
) -> Result<MaskedExpression> {
    if thresholds.len() != expression.n_samples() {
        return Err(GexError::DimensionMismatch {
            expected: expression.n_samples(),
            actual: thresholds.len(),
        });
    }

    let mut masked = expression.clone();
    for col in 0..expression.n_samples() {
        let threshold = thresholds[col];
        for row in 0..expression.n_probes() {
            if masked.get(row, col) < threshold {
                masked.set(row, col, f64::NAN);
            }
        }
    }

    Ok(MaskedExpression {
        masked,
        backup: expression.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn create_log2_matrix() -> ExpressionMatrix {
        let data = DMatrix::from_row_slice(
            2,
            3,
            &[
                5.0, 3.0, 7.0, //
                4.0, 4.0, 2.0,
            ],
        );
        ExpressionMatrix::new(
            data,
            vec!["p1".into(), "p2".into()],
            vec!["S1".into(), "S2".into(), "S3".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_masks_strictly_below_threshold() {
        let expr = create_log2_matrix();
        let result = signal_filter(&expr, &[4.0, 4.0, 4.0]).unwrap();

        assert_relative_eq!(result.masked.get(0, 0), 5.0);
        assert!(result.masked.get(0, 1).is_nan());
        // exactly at the threshold is kept
        assert_relative_eq!(result.masked.get(1, 0), 4.0);
        assert!(result.masked.get(1, 2).is_nan());
    }

    #[test]
    fn test_backup_is_untouched() {
        let expr = create_log2_matrix();
        let result = signal_filter(&expr, &[10.0, 10.0, 10.0]).unwrap();

        // everything masked, backup identical to input
        for row in 0..2 {
            for col in 0..3 {
                assert!(result.masked.get(row, col).is_nan());
                assert_relative_eq!(result.backup.get(row, col), expr.get(row, col));
            }
        }
    }

    #[test]
    fn test_raising_threshold_never_unmasks() {
        let expr = create_log2_matrix();
        let low = signal_filter(&expr, &[3.0, 3.0, 3.0]).unwrap();
        let high = signal_filter(&expr, &[5.0, 5.0, 5.0]).unwrap();

        let present = |m: &ExpressionMatrix| {
            (0..2)
                .flat_map(|r| (0..3).map(move |c| (r, c)))
                .filter(|&(r, c)| m.is_present(r, c))
                .count()
        };
        assert!(present(&high.masked) <= present(&low.masked));
    }

    #[test]
    fn test_threshold_count_mismatch() {
        let expr = create_log2_matrix();
        assert!(signal_filter(&expr, &[4.0, 4.0]).is_err());
    }
}
