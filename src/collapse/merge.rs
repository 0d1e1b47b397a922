//! Union merge of per-group retained probe sets onto the unmasked backup.

use crate::data::{ExpressionMatrix, GroupTables};
use crate::error::Result;
use std::collections::HashSet;

/// Merge the four per-group retained probe sets and map the union back onto
/// the unmasked backup matrix.
///
/// The merge is a full outer union: a probe only has to pass retention in a
/// single group to survive. Surviving rows are taken from the backup, so a
/// probe's values are rescued even for samples where the signal filter had
/// masked them. The projected log2 values are then inverted (`2^x`) back to
/// linear scale.
///
/// Row order of the result follows the backup's original row order.
pub fn merge_retained_probes(
    backup: &ExpressionMatrix,
    retained: &GroupTables<Vec<usize>>,
) -> Result<ExpressionMatrix> {
    let union: HashSet<usize> = retained
        .iter()
        .flat_map(|(_, rows)| rows.iter().copied())
        .collect();

    // original row order keeps the output deterministic
    let rows: Vec<usize> = (0..backup.n_probes())
        .filter(|row| union.contains(row))
        .collect();

    Ok(backup.subset_probes(&rows)?.map_exp2())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn create_backup() -> ExpressionMatrix {
        // log2 scale
        let data = DMatrix::from_row_slice(
            4,
            2,
            &[
                1.0, 2.0, //
                3.0, 4.0, //
                5.0, 6.0, //
                7.0, 8.0,
            ],
        );
        ExpressionMatrix::new(
            data,
            vec!["p0".into(), "p1".into(), "p2".into(), "p3".into()],
            vec!["S1".into(), "S2".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_union_not_intersection() {
        let backup = create_backup();
        // probe 2 passes in exactly one group and must still survive
        let retained = GroupTables {
            pos_unstim: vec![0],
            pos_stim: vec![0, 1],
            neg_unstim: vec![2],
            neg_stim: vec![],
        };
        let merged = merge_retained_probes(&backup, &retained).unwrap();
        assert_eq!(merged.probe_ids(), &["p0", "p1", "p2"]);
    }

    #[test]
    fn test_rescue_uses_backup_values_on_linear_scale() {
        let backup = create_backup();
        let retained = GroupTables {
            pos_unstim: vec![3],
            pos_stim: vec![],
            neg_unstim: vec![],
            neg_stim: vec![],
        };
        let merged = merge_retained_probes(&backup, &retained).unwrap();
        assert_eq!(merged.n_probes(), 1);
        // 2^7 and 2^8, straight from the unmasked backup
        assert_relative_eq!(merged.get(0, 0), 128.0);
        assert_relative_eq!(merged.get(0, 1), 256.0);
    }

    #[test]
    fn test_row_order_is_original() {
        let backup = create_backup();
        let retained = GroupTables {
            pos_unstim: vec![3, 0],
            pos_stim: vec![1],
            neg_unstim: vec![],
            neg_stim: vec![],
        };
        let merged = merge_retained_probes(&backup, &retained).unwrap();
        assert_eq!(merged.probe_ids(), &["p0", "p1", "p3"]);
    }
}
