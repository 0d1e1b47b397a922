//! Control-probe matrix with per-row control-type tags.

use crate::error::{GexError, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Control type tag understood by the noise-floor estimator.
pub const NEGATIVE_CONTROL: &str = "NEGATIVE";

/// Intensities of control probes across samples, tagged by control type.
///
/// Rows are control probes, columns are samples. Produced alongside the
/// expression matrix by the upstream normalization step.
#[derive(Debug, Clone)]
pub struct ControlMatrix {
    /// Dense matrix (control probes × samples), linear scale.
    data: DMatrix<f64>,
    /// Control probe identifiers (row names).
    probe_ids: Vec<String>,
    /// Control type per row (e.g. "NEGATIVE", "BIOTIN", "HOUSEKEEPING").
    control_types: Vec<String>,
    /// Sample identifiers (column names).
    sample_ids: Vec<String>,
}

impl ControlMatrix {
    /// Create a new ControlMatrix.
    pub fn new(
        data: DMatrix<f64>,
        probe_ids: Vec<String>,
        control_types: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != probe_ids.len() || nrows != control_types.len() {
            return Err(GexError::DimensionMismatch {
                expected: nrows,
                actual: probe_ids.len().min(control_types.len()),
            });
        }
        if ncols != sample_ids.len() {
            return Err(GexError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            probe_ids,
            control_types,
            sample_ids,
        })
    }

    /// Load a control matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: `probe_id\tcontrol_type\t<sample IDs...>`
    /// - Subsequent rows: probe ID, control type, intensities
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| GexError::EmptyData("Empty control file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 3 {
            return Err(GexError::MissingColumn("control_type".to_string()));
        }
        let sample_ids: Vec<String> = header[2..].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        let mut probe_ids = Vec::new();
        let mut control_types = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n_samples + 2 {
                return Err(GexError::DimensionMismatch {
                    expected: n_samples + 2,
                    actual: fields.len(),
                });
            }
            probe_ids.push(fields[0].to_string());
            control_types.push(fields[1].trim().to_string());
            for (col_idx, value_str) in fields[2..].iter().enumerate() {
                let raw = value_str.trim();
                let value: f64 = raw.parse().map_err(|_| GexError::InvalidValue {
                    value: raw.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                values.push(value);
            }
        }

        if probe_ids.is_empty() {
            return Err(GexError::EmptyData("No control probes in TSV".to_string()));
        }

        let data = DMatrix::from_row_slice(probe_ids.len(), n_samples, &values);
        Self::new(data, probe_ids, control_types, sample_ids)
    }

    /// Number of control probes (rows).
    pub fn n_probes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Sample identifiers.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Control type per row.
    pub fn control_types(&self) -> &[String] {
        &self.control_types
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Row indices tagged with the given control type (case-insensitive).
    pub fn rows_of_type(&self, control_type: &str) -> Vec<usize> {
        self.control_types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.eq_ignore_ascii_case(control_type))
            .map(|(i, _)| i)
            .collect()
    }

    /// Intensities of the negative-control probes, one column per sample.
    ///
    /// Fails if the matrix contains no rows tagged `NEGATIVE`.
    pub fn negative_controls(&self) -> Result<DMatrix<f64>> {
        let rows = self.rows_of_type(NEGATIVE_CONTROL);
        if rows.is_empty() {
            return Err(GexError::EmptyData(
                "Control matrix contains no negative-control probes".to_string(),
            ));
        }
        let mut neg = DMatrix::zeros(rows.len(), self.n_samples());
        for (new_row, &old_row) in rows.iter().enumerate() {
            for col in 0..self.n_samples() {
                neg[(new_row, col)] = self.data[(old_row, col)];
            }
        }
        Ok(neg)
    }
}
