//! Per-sample detection thresholds from negative-control probes.

use crate::data::ControlMatrix;
use crate::error::{GexError, Result};
use rayon::prelude::*;
use statrs::statistics::{Data, OrderStatistics};

/// Compute one detection threshold per requested sample.
///
/// For every sample the threshold is the `percentile` quantile of that
/// sample's negative-control intensities, log2-transformed. Thresholds are
/// returned in the order of `sample_ids`, which is expected to be the
/// expression matrix's column order.
///
/// Fails when a requested sample has no column in the control matrix, when
/// the control matrix has no negative-control rows, or when the percentile
/// is outside [0, 1].
pub fn noise_floor_thresholds(
    controls: &ControlMatrix,
    sample_ids: &[String],
    percentile: f64,
) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&percentile) {
        return Err(GexError::InvalidParameter(
            "Control percentile must be between 0 and 1".to_string(),
        ));
    }

    let negatives = controls.negative_controls()?;

    let columns: Vec<usize> = sample_ids
        .iter()
        .map(|sid| {
            controls
                .sample_ids()
                .iter()
                .position(|s| s == sid)
                .ok_or_else(|| {
                    GexError::SampleMismatch(format!(
                        "Sample '{}' not found in control matrix",
                        sid
                    ))
                })
        })
        .collect::<Result<_>>()?;

    let thresholds: Vec<f64> = columns
        .into_par_iter()
        .map(|col| {
            let values: Vec<f64> = (0..negatives.nrows()).map(|row| negatives[(row, col)]).collect();
            let mut data = Data::new(values);
            data.quantile(percentile).log2()
        })
        .collect();

    Ok(thresholds)
}
