//! Group-wise probe retention filtering.

use crate::data::ExpressionMatrix;
use crate::error::{GexError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Retention statistics for one cohort group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionResult {
    /// Group label.
    pub group: String,
    /// Group size (number of samples).
    pub n_samples: usize,
    /// Minimum present samples required per probe.
    pub min_required: usize,
    /// Number of probes before filtering.
    pub n_before: usize,
    /// Number of probes retained.
    pub n_after: usize,
    /// Number of probes removed.
    pub n_removed: usize,
    /// Proportion of probes retained.
    pub retention_rate: f64,
}

impl std::fmt::Display for RetentionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Retention [{}]", self.group)?;
        writeln!(
            f,
            "  Required:  {} of {} samples present",
            self.min_required, self.n_samples
        )?;
        writeln!(f, "  Before:    {} probes", self.n_before)?;
        writeln!(f, "  After:     {} probes", self.n_after)?;
        writeln!(f, "  Removed:   {} probes", self.n_removed)?;
        writeln!(f, "  Retained:  {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Outcome of retention filtering for one group.
#[derive(Debug, Clone)]
pub struct GroupRetention {
    /// Indices of retained probes, in original row order.
    pub retained: Vec<usize>,
    /// Present-sample count per probe (diagnostics only).
    pub present_counts: Vec<usize>,
    /// Summary statistics.
    pub stats: RetentionResult,
}

/// Filter probes by presence within one cohort group.
///
/// A cell counts as present when it is non-missing and strictly greater
/// than zero. A probe is retained iff its present count over the group's
/// sample columns reaches `ceil(group_size × fraction)`. The ceiling is
/// load-bearing: for 4 samples at fraction 0.75 the minimum is 3, not 2.
///
/// An empty retained set is not an error here; the pipeline reports it as
/// a warning. A group with no samples retains nothing.
pub fn filter_group_retention(
    masked: &ExpressionMatrix,
    group_label: &str,
    group_columns: &[usize],
    fraction: f64,
) -> Result<GroupRetention> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(GexError::InvalidParameter(
            "Retention fraction must be between 0 and 1".to_string(),
        ));
    }
    for &col in group_columns {
        if col >= masked.n_samples() {
            return Err(GexError::InvalidParameter(format!(
                "Sample index {} out of bounds",
                col
            )));
        }
    }

    let group_size = group_columns.len();
    let min_required = (fraction * group_size as f64).ceil() as usize;
    let n_probes = masked.n_probes();

    let present_counts: Vec<usize> = (0..n_probes)
        .into_par_iter()
        .map(|row| {
            group_columns
                .iter()
                .filter(|&&col| masked.is_present(row, col))
                .count()
        })
        .collect();

    let retained: Vec<usize> = if group_size == 0 {
        Vec::new()
    } else {
        present_counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count >= min_required)
            .map(|(row, _)| row)
            .collect()
    };

    let n_after = retained.len();
    let stats = RetentionResult {
        group: group_label.to_string(),
        n_samples: group_size,
        min_required,
        n_before: n_probes,
        n_after,
        n_removed: n_probes - n_after,
        retention_rate: if n_probes > 0 {
            n_after as f64 / n_probes as f64
        } else {
            0.0
        },
    };

    Ok(GroupRetention {
        retained,
        present_counts,
        stats,
    })
}
