//! Probe-to-gene collapse by maximum-magnitude selection.

use crate::data::{ExpressionMatrix, ProbeAnnotation};
use crate::error::Result;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Collapse probe rows into one row per gene symbol.
///
/// For every gene and sample the representative value is the one of
/// greatest absolute magnitude among the gene's constituent probes, with
/// its sign preserved. The traversal order is ascending gene symbol, then
/// original row order within a gene; equal-magnitude ties resolve to the
/// first probe encountered. A gene with a single probe passes its values
/// through unchanged.
///
/// Every probe in the matrix must be annotated; an unknown probe is fatal.
pub fn collapse_genes(
    expression: &ExpressionMatrix,
    annotation: &ProbeAnnotation,
) -> Result<ExpressionMatrix> {
    let n_samples = expression.n_samples();

    // BTreeMap gives the ascending-gene-symbol traversal; pushing rows in
    // index order keeps the within-gene order original.
    let mut gene_rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, probe_id) in expression.probe_ids().iter().enumerate() {
        let gene = annotation.require_gene(probe_id)?;
        gene_rows.entry(gene.to_string()).or_default().push(row);
    }

    let genes: Vec<(String, Vec<usize>)> = gene_rows.into_iter().collect();

    let collapsed_rows: Vec<Vec<f64>> = genes
        .par_iter()
        .map(|(_, rows)| {
            (0..n_samples)
                .map(|col| {
                    let mut best: Option<f64> = None;
                    for &row in rows {
                        let v = expression.get(row, col);
                        if v.is_nan() {
                            continue;
                        }
                        match best {
                            // strictly greater: first probe wins ties
                            Some(b) if v.abs() <= b.abs() => {}
                            _ => best = Some(v),
                        }
                    }
                    best.unwrap_or(f64::NAN)
                })
                .collect()
        })
        .collect();

    let gene_ids: Vec<String> = genes.into_iter().map(|(g, _)| g).collect();
    let flat: Vec<f64> = collapsed_rows.into_iter().flatten().collect();
    let data = DMatrix::from_row_slice(gene_ids.len(), n_samples, &flat);

    ExpressionMatrix::new(data, gene_ids, expression.sample_ids().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn matrix(values: &[f64], probes: &[&str], samples: &[&str]) -> ExpressionMatrix {
        let data = DMatrix::from_row_slice(probes.len(), samples.len(), values);
        ExpressionMatrix::new(
            data,
            probes.iter().map(|s| s.to_string()).collect(),
            samples.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_signed_max_magnitude() {
        // probe values [-5, 3, 4] must collapse to -5
        let expr = matrix(&[-5.0, 3.0, 4.0], &["p1", "p2", "p3"], &["S1"]);
        let ann = ProbeAnnotation::from_pairs([("p1", "G1"), ("p2", "G1"), ("p3", "G1")]);
        let collapsed = collapse_genes(&expr, &ann).unwrap();

        assert_eq!(collapsed.probe_ids(), &["G1"]);
        assert_relative_eq!(collapsed.get(0, 0), -5.0);
    }

    #[test]
    fn test_tie_goes_to_first_probe() {
        let expr = matrix(&[4.0, -4.0], &["p1", "p2"], &["S1"]);
        let ann = ProbeAnnotation::from_pairs([("p1", "G1"), ("p2", "G1")]);
        let collapsed = collapse_genes(&expr, &ann).unwrap();
        assert_relative_eq!(collapsed.get(0, 0), 4.0);
    }

    #[test]
    fn test_single_probe_passes_through() {
        let expr = matrix(&[2.5, 7.0], &["p1"], &["S1", "S2"]);
        let ann = ProbeAnnotation::from_pairs([("p1", "TNF")]);
        let collapsed = collapse_genes(&expr, &ann).unwrap();
        assert_relative_eq!(collapsed.get(0, 0), 2.5);
        assert_relative_eq!(collapsed.get(0, 1), 7.0);
    }

    #[test]
    fn test_genes_sorted_ascending() {
        let expr = matrix(&[1.0, 2.0, 3.0], &["p1", "p2", "p3"], &["S1"]);
        let ann = ProbeAnnotation::from_pairs([("p1", "ZZZ"), ("p2", "AAA"), ("p3", "MMM")]);
        let collapsed = collapse_genes(&expr, &ann).unwrap();
        assert_eq!(collapsed.probe_ids(), &["AAA", "MMM", "ZZZ"]);
        assert_relative_eq!(collapsed.get(0, 0), 2.0);
        assert_relative_eq!(collapsed.get(2, 0), 1.0);
    }

    #[test]
    fn test_per_sample_selection_is_independent() {
        let expr = matrix(
            &[
                5.0, 1.0, //
                2.0, -6.0,
            ],
            &["p1", "p2"],
            &["S1", "S2"],
        );
        let ann = ProbeAnnotation::from_pairs([("p1", "G1"), ("p2", "G1")]);
        let collapsed = collapse_genes(&expr, &ann).unwrap();
        assert_relative_eq!(collapsed.get(0, 0), 5.0);
        assert_relative_eq!(collapsed.get(0, 1), -6.0);
    }

    #[test]
    fn test_unannotated_probe_is_fatal() {
        let expr = matrix(&[1.0], &["p1"], &["S1"]);
        let ann = ProbeAnnotation::from_pairs([("other", "G1")]);
        assert!(collapse_genes(&expr, &ann).is_err());
    }
}
