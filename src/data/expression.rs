//! Dense expression matrix for normalized probe intensities.

use crate::error::{GexError, Result};
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A dense expression matrix storing probe intensities across samples.
///
/// Rows represent probes, columns represent samples. Values are `f64` on
/// whatever scale the current pipeline stage uses (log2 in intermediate
/// stages, linear in final output). The missing-value marker is `f64::NAN`;
/// a cell is "present" when it is finite and strictly positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    /// Dense matrix (probes × samples).
    data: DMatrix<f64>,
    /// Probe identifiers (row names).
    probe_ids: Vec<String>,
    /// Sample identifiers (column names).
    sample_ids: Vec<String>,
}

impl ExpressionMatrix {
    /// Create a new ExpressionMatrix from a dense matrix and identifiers.
    pub fn new(
        data: DMatrix<f64>,
        probe_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != probe_ids.len() {
            return Err(GexError::DimensionMismatch {
                expected: nrows,
                actual: probe_ids.len(),
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
            sample_ids,
        })
    }

    /// Load an expression matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with sample IDs (first column is the probe ID header)
    /// - Subsequent rows: probe ID followed by intensities
    ///
    /// Empty cells and `NA` parse to the missing-value marker.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| GexError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(GexError::EmptyData(
                "TSV must have at least one sample".to_string(),
            ));
        }
        let sample_ids: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
        let n_samples = sample_ids.len();

        let mut probe_ids: Vec<String> = Vec::new();
        let mut values: Vec<f64> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n_samples + 1 {
                return Err(GexError::DimensionMismatch {
                    expected: n_samples + 1,
                    actual: fields.len(),
                });
            }
            probe_ids.push(fields[0].to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let raw = value_str.trim();
                let value = if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
                    f64::NAN
                } else {
                    raw.parse().map_err(|_| GexError::InvalidValue {
                        value: raw.to_string(),
                        row: row_idx,
                        col: col_idx,
                    })?
                };
                values.push(value);
            }
        }

        let n_probes = probe_ids.len();
        if n_probes == 0 {
            return Err(GexError::EmptyData("No probes in TSV".to_string()));
        }

        // values were collected row-major
        let data = DMatrix::from_row_slice(n_probes, n_samples, &values);
        Self::new(data, probe_ids, sample_ids)
    }

    /// Write the expression matrix to a TSV file.
    ///
    /// Missing values are written as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "probe_id")?;
        for sample_id in &self.sample_ids {
            write!(writer, "\t{}", sample_id)?;
        }
        writeln!(writer)?;

        for (row_idx, probe_id) in self.probe_ids.iter().enumerate() {
            write!(writer, "{}", probe_id)?;
            for col_idx in 0..self.n_samples() {
                let value = self.get(row_idx, col_idx);
                if value.is_nan() {
                    write!(writer, "\tNA")?;
                } else {
                    write!(writer, "\t{}", value)?;
                }
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the value at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Set the value at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[(row, col)] = value;
    }

    /// Whether the cell holds a present (non-missing, strictly positive) value.
    #[inline]
    pub fn is_present(&self, row: usize, col: usize) -> bool {
        let v = self.data[(row, col)];
        v.is_finite() && v > 0.0
    }

    /// Number of probes (rows).
    #[inline]
    pub fn n_probes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Probe identifiers.
    #[inline]
    pub fn probe_ids(&self) -> &[String] {
        &self.probe_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get reference to the underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Column index of a sample ID.
    pub fn sample_index(&self, sample_id: &str) -> Option<usize> {
        self.sample_ids.iter().position(|s| s == sample_id)
    }

    /// Get a dense vector for a specific row (probe).
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().cloned().collect()
    }

    /// Get a dense vector for a specific column (sample).
    pub fn col_dense(&self, col: usize) -> Vec<f64> {
        self.data.column(col).iter().cloned().collect()
    }

    /// Subset the matrix to the specified probes (by row index), in the given order.
    pub fn subset_probes(&self, indices: &[usize]) -> Result<Self> {
        let n_samples = self.n_samples();
        let mut new_probe_ids = Vec::with_capacity(indices.len());
        let mut data = DMatrix::zeros(indices.len(), n_samples);

        for (new_row, &old_row) in indices.iter().enumerate() {
            if old_row >= self.n_probes() {
                return Err(GexError::InvalidParameter(format!(
                    "Probe index {} out of bounds",
                    old_row
                )));
            }
            new_probe_ids.push(self.probe_ids[old_row].clone());
            for col in 0..n_samples {
                data[(new_row, col)] = self.data[(old_row, col)];
            }
        }

        Self::new(data, new_probe_ids, self.sample_ids.clone())
    }

    /// Subset the matrix to the specified samples (by column index), in the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let n_probes = self.n_probes();
        let mut new_sample_ids = Vec::with_capacity(indices.len());
        let mut data = DMatrix::zeros(n_probes, indices.len());

        for (new_col, &old_col) in indices.iter().enumerate() {
            if old_col >= self.n_samples() {
                return Err(GexError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            new_sample_ids.push(self.sample_ids[old_col].clone());
            for row in 0..n_probes {
                data[(row, new_col)] = self.data[(row, old_col)];
            }
        }

        Self::new(data, self.probe_ids.clone(), new_sample_ids)
    }

    /// Reorder columns to match the given sample IDs.
    ///
    /// Fails if any requested sample is absent from the matrix.
    pub fn select_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let index: HashMap<&str, usize> = self
            .sample_ids
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let indices: Vec<usize> = sample_ids
            .iter()
            .map(|sid| {
                index.get(sid.as_str()).copied().ok_or_else(|| {
                    GexError::SampleMismatch(format!(
                        "Sample '{}' not found in expression matrix",
                        sid
                    ))
                })
            })
            .collect::<Result<_>>()?;
        self.subset_samples(&indices)
    }

    /// Elementwise log2 transform of every value.
    pub fn map_log2(&self) -> Self {
        Self {
            data: self.data.map(|x| x.log2()),
            probe_ids: self.probe_ids.clone(),
            sample_ids: self.sample_ids.clone(),
        }
    }

    /// Elementwise 2^x transform of every value (inverse of log2).
    pub fn map_exp2(&self) -> Self {
        Self {
            data: self.data.map(|x| x.exp2()),
            probe_ids: self.probe_ids.clone(),
            sample_ids: self.sample_ids.clone(),
        }
    }
}
