//! Assembly of the five cohort contrast tables.

use crate::data::{BaseGroup, CohortRegistry, ExpressionMatrix, GroupTables};
use crate::error::{GexError, Result};
use nalgebra::DMatrix;
use regex::Regex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A gene × sample output table for one experimental contrast.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastTable {
    /// Table name, also the output file stem.
    pub name: String,
    /// Gene symbols (row names).
    pub gene_ids: Vec<String>,
    /// Column labels (sample IDs, or rewritten difference labels).
    pub columns: Vec<String>,
    /// Dense values (genes × columns).
    pub data: DMatrix<f64>,
}

impl ContrastTable {
    /// Number of gene rows.
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of sample columns.
    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    /// Value at (gene row, column).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Write the table to a TSV file with a header row.
    ///
    /// Missing values are written as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "gene_id")?;
        for column in &self.columns {
            write!(writer, "\t{}", column)?;
        }
        writeln!(writer)?;

        for (row, gene_id) in self.gene_ids.iter().enumerate() {
            write!(writer, "{}", gene_id)?;
            for col in 0..self.n_columns() {
                let value = self.data[(row, col)];
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
}

/// The five contrast tables produced by the pipeline.
#[derive(Debug, Clone)]
pub struct ContrastSet {
    /// Cohort-positive samples: unstimulated then stimulated columns.
    pub tbam_pos: ContrastTable,
    /// Cohort-negative samples: unstimulated then stimulated columns.
    pub tbam_neg: ContrastTable,
    /// Unstimulated condition: cohort-negative then cohort-positive columns.
    pub media: ContrastTable,
    /// Stimulated condition: cohort-negative then cohort-positive columns.
    pub tb: ContrastTable,
    /// Per-pair stimulated minus unstimulated differences, negative cohort first.
    pub tbmm: ContrastTable,
}

impl ContrastSet {
    /// All five tables in a fixed order.
    pub fn tables(&self) -> [&ContrastTable; 5] {
        [
            &self.tbam_pos,
            &self.tbam_neg,
            &self.media,
            &self.tb,
            &self.tbmm,
        ]
    }

    /// Write all five tables into a directory as `<name>.tsv`.
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        for table in self.tables() {
            table.to_tsv(dir.join(format!("{}.tsv", table.name)))?;
        }
        Ok(())
    }
}

/// Build the five contrast tables from the collapsed gene-level matrix.
///
/// The matrix is re-split into the four base groups using the registry's
/// member ordering, then recombined by column selection. The difference
/// table subtracts unstimulated from stimulated values pairwise per cohort;
/// the stim/unstim column counts must match per cohort, since the pairing
/// is positional.
pub fn build_contrasts(
    collapsed: &ExpressionMatrix,
    registry: &CohortRegistry,
    stim_label: &str,
    diff_label: &str,
) -> Result<ContrastSet> {
    let indices = registry.group_indices(collapsed.sample_ids())?;
    let split: GroupTables<ExpressionMatrix> =
        GroupTables::try_from_fn(|group| collapsed.subset_samples(indices.get(group)))?;

    let gene_ids = collapsed.probe_ids().to_vec();

    let tbam_pos = concat_table(
        "TBAM_POS",
        &gene_ids,
        &split.pos_unstim,
        &split.pos_stim,
    );
    let tbam_neg = concat_table(
        "TBAM_NEG",
        &gene_ids,
        &split.neg_unstim,
        &split.neg_stim,
    );
    let media = concat_table("MEDIA", &gene_ids, &split.neg_unstim, &split.pos_unstim);
    let tb = concat_table("TB", &gene_ids, &split.neg_stim, &split.pos_stim);

    let neg_diff = paired_difference(
        BaseGroup::NegStim,
        &split.neg_stim,
        &split.neg_unstim,
        stim_label,
        diff_label,
    )?;
    let pos_diff = paired_difference(
        BaseGroup::PosStim,
        &split.pos_stim,
        &split.pos_unstim,
        stim_label,
        diff_label,
    )?;

    let mut columns = neg_diff.0;
    columns.extend(pos_diff.0);
    let n_genes = gene_ids.len();
    let mut data = DMatrix::from_element(n_genes, columns.len(), f64::NAN);
    for (col, values) in neg_diff.1.iter().chain(pos_diff.1.iter()).enumerate() {
        for row in 0..n_genes {
            data[(row, col)] = values[row];
        }
    }

    let tbmm = ContrastTable {
        name: "TBMM".to_string(),
        gene_ids,
        columns,
        data,
    };

    Ok(ContrastSet {
        tbam_pos,
        tbam_neg,
        media,
        tb,
        tbmm,
    })
}

/// Concatenate two column blocks into one table, left block first.
fn concat_table(
    name: &str,
    gene_ids: &[String],
    left: &ExpressionMatrix,
    right: &ExpressionMatrix,
) -> ContrastTable {
    let n_genes = gene_ids.len();
    let n_cols = left.n_samples() + right.n_samples();
    let mut columns = left.sample_ids().to_vec();
    columns.extend_from_slice(right.sample_ids());

    let mut data = DMatrix::from_element(n_genes, n_cols, f64::NAN);
    for row in 0..n_genes {
        for col in 0..left.n_samples() {
            data[(row, col)] = left.get(row, col);
        }
        for col in 0..right.n_samples() {
            data[(row, left.n_samples() + col)] = right.get(row, col);
        }
    }

    ContrastTable {
        name: name.to_string(),
        gene_ids: gene_ids.to_vec(),
        columns,
        data,
    }
}

/// Column-wise stimulated − unstimulated differences for one cohort.
///
/// Columns are matched by position; a count mismatch means the biological
/// pairing is broken and is fatal.
fn paired_difference(
    stim_group: BaseGroup,
    stimulated: &ExpressionMatrix,
    unstimulated: &ExpressionMatrix,
    stim_label: &str,
    diff_label: &str,
) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    if stimulated.n_samples() != unstimulated.n_samples() {
        return Err(GexError::PairingMismatch {
            group: stim_group.label().to_string(),
            stimulated: stimulated.n_samples(),
            unstimulated: unstimulated.n_samples(),
        });
    }

    let rewrite = label_rewriter(stim_label)?;
    let columns: Vec<String> = stimulated
        .sample_ids()
        .iter()
        .map(|sid| rewrite(sid, diff_label))
        .collect();

    let n_genes = stimulated.n_probes();
    let values: Vec<Vec<f64>> = (0..stimulated.n_samples())
        .map(|col| {
            (0..n_genes)
                .map(|row| stimulated.get(row, col) - unstimulated.get(row, col))
                .collect()
        })
        .collect();

    Ok((columns, values))
}

/// Rewrite a stimulated sample id into its difference-column label.
///
/// The condition label is replaced where it terminates the id; a
/// non-terminal occurrence falls back to first-occurrence replacement, and
/// an id without the label gets the difference label appended.
fn label_rewriter(stim_label: &str) -> Result<impl Fn(&str, &str) -> String> {
    let anchored = Regex::new(&format!("{}$", regex::escape(stim_label)))
        .map_err(|e| GexError::InvalidParameter(format!("Bad condition label: {}", e)))?;
    let stim = stim_label.to_string();
    Ok(move |sample_id: &str, diff_label: &str| {
        if anchored.is_match(sample_id) {
            anchored.replace(sample_id, diff_label).into_owned()
        } else if sample_id.contains(&stim) {
            sample_id.replacen(&stim, diff_label, 1)
        } else {
            format!("{}_{}", sample_id, diff_label)
        }
    })
}
