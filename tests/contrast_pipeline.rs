//! Integration tests for the full contrast pipeline.

use approx::assert_relative_eq;
use gex_contrast::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

const SAMPLES: [&str; 12] = [
    "N1_MEDIA", "N2_MEDIA", "N3_MEDIA", //
    "N1_TB", "N2_TB", "N3_TB", //
    "P1_MEDIA", "P2_MEDIA", "P3_MEDIA", //
    "P1_TB", "P2_TB", "P3_TB",
];

/// Write the synthetic expression matrix TSV (log2 scale).
///
/// - `pA1` (GENE_A): log2 = 6 everywhere, clears the floor in all groups
/// - `pA2` (GENE_A): log2 = 3 everywhere, below the floor everywhere
/// - `pB1` (GENE_B): log2 = 5 everywhere, clears the floor in all groups
/// - `pC1` (GENE_C): log2 = 6 in NEG_MEDIA samples only, 2 elsewhere;
///   passes retention only in NEG_MEDIA and relies on the union rescue
fn write_expression() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "probe_id\t{}", SAMPLES.join("\t")).unwrap();

    let row = |id: &str, value_for: &dyn Fn(&str) -> f64| {
        let values: Vec<String> = SAMPLES.iter().map(|&s| value_for(s).to_string()).collect();
        format!("{}\t{}", id, values.join("\t"))
    };

    writeln!(file, "{}", row("pA1", &|_| 6.0)).unwrap();
    writeln!(file, "{}", row("pA2", &|_| 3.0)).unwrap();
    writeln!(file, "{}", row("pB1", &|_| 5.0)).unwrap();
    writeln!(
        file,
        "{}",
        row("pC1", &|s| {
            if s.starts_with('N') && s.ends_with("MEDIA") {
                6.0
            } else {
                2.0
            }
        })
    )
    .unwrap();
    file.flush().unwrap();
    file
}

/// Negative controls are constant 16, so every threshold is log2(16) = 4.
fn write_controls() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "probe_id\tcontrol_type\t{}", SAMPLES.join("\t")).unwrap();
    for i in 0..4 {
        let values = vec!["16"; SAMPLES.len()].join("\t");
        writeln!(file, "neg{}\tNEGATIVE\t{}", i, values).unwrap();
    }
    let values = vec!["9000"; SAMPLES.len()].join("\t");
    writeln!(file, "bio0\tBIOTIN\t{}", values).unwrap();
    file.flush().unwrap();
    file
}

fn write_annotation() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "probe_id\tgene_symbol").unwrap();
    writeln!(file, "pA1\tGENE_A").unwrap();
    writeln!(file, "pA2\tGENE_A").unwrap();
    writeln!(file, "pB1\tGENE_B").unwrap();
    writeln!(file, "pC1\tGENE_C").unwrap();
    file.flush().unwrap();
    file
}

fn write_cohorts() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "sample_id\tgroup").unwrap();
    for sample in SAMPLES {
        let label = match (sample.starts_with('P'), sample.ends_with("TB")) {
            (true, true) => "POS_TB",
            (true, false) => "POS_MEDIA",
            (false, true) => "NEG_TB",
            (false, false) => "NEG_MEDIA",
        };
        writeln!(file, "{}\t{}", sample, label).unwrap();
    }
    file.flush().unwrap();
    file
}

fn load_inputs() -> (
    ExpressionMatrix,
    ControlMatrix,
    ProbeAnnotation,
    CohortRegistry,
) {
    let expression = ExpressionMatrix::from_tsv(write_expression().path()).unwrap();
    let controls = ControlMatrix::from_tsv(write_controls().path()).unwrap();
    let annotation = ProbeAnnotation::from_tsv(write_annotation().path()).unwrap();
    let registry = CohortRegistry::from_tsv(write_cohorts().path()).unwrap();
    (expression, controls, annotation, registry)
}

fn run_pipeline() -> (ContrastSet, PipelineReport) {
    let (expression, controls, annotation, registry) = load_inputs();
    Pipeline::new()
        .run(&expression, &controls, &annotation, &registry)
        .unwrap()
}

#[test]
fn end_to_end_tb_table() {
    let (contrasts, report) = run_pipeline();

    // pA2 fails the floor everywhere; the three other probes survive
    assert_eq!(report.n_union_probes, 3);
    assert_eq!(report.n_genes, 3);

    let tb = &contrasts.tb;
    // one row per gene, ascending
    assert_eq!(tb.gene_ids, vec!["GENE_A", "GENE_B", "GENE_C"]);
    // 3 + 3 samples, negative cohort first
    assert_eq!(
        tb.columns,
        vec!["N1_TB", "N2_TB", "N3_TB", "P1_TB", "P2_TB", "P3_TB"]
    );
    // linear-scale originals, no masking artifacts
    for col in 0..6 {
        assert_relative_eq!(tb.get(0, col), 64.0); // 2^6
        assert_relative_eq!(tb.get(1, col), 32.0); // 2^5
    }
}

#[test]
fn union_rescues_masked_values() {
    let (contrasts, report) = run_pipeline();

    // pC1 passes retention only in NEG_MEDIA (3 of 3 present, min = 3)
    let neg_media = report
        .retention
        .iter()
        .find(|r| r.group == "NEG_MEDIA")
        .unwrap();
    assert_eq!(neg_media.min_required, 3);

    // GENE_C still appears in every table
    for table in contrasts.tables() {
        assert!(table.gene_ids.contains(&"GENE_C".to_string()), "{}", table.name);
    }

    // and its TB values are the rescued, unmasked 2^2 = 4.0 despite having
    // been masked below the log2(16) floor in the stimulated samples
    let tb = &contrasts.tb;
    for col in 0..6 {
        assert_relative_eq!(tb.get(2, col), 4.0);
    }
}

#[test]
fn difference_table_values_and_labels() {
    let (contrasts, _) = run_pipeline();

    let tbmm = &contrasts.tbmm;
    assert_eq!(
        tbmm.columns,
        vec![
            "N1_TBMM", "N2_TBMM", "N3_TBMM", "P1_TBMM", "P2_TBMM", "P3_TBMM"
        ]
    );
    // GENE_A is flat: 64 − 64 = 0 for every pair
    for col in 0..6 {
        assert_relative_eq!(tbmm.get(0, col), 0.0);
    }
    // GENE_C, negative cohort: tb 4.0 − media 64.0
    for col in 0..3 {
        assert_relative_eq!(tbmm.get(2, col), -60.0);
    }
    // GENE_C, positive cohort: 4.0 − 4.0
    for col in 3..6 {
        assert_relative_eq!(tbmm.get(2, col), 0.0);
    }
}

#[test]
fn cohort_tables_partition_samples() {
    let (contrasts, _) = run_pipeline();

    assert_eq!(contrasts.tbam_pos.n_columns(), 6);
    assert_eq!(contrasts.tbam_neg.n_columns(), 6);
    for column in &contrasts.tbam_pos.columns {
        assert!(
            !contrasts.tbam_neg.columns.contains(column),
            "sample {} double-counted",
            column
        );
    }
}

#[test]
fn rerun_is_byte_identical() {
    fn write_run(dir: &Path) {
        let (contrasts, _) = run_pipeline();
        contrasts.write_all(dir).unwrap();
    }

    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write_run(first.path());
    write_run(second.path());

    for name in ["TBAM_POS", "TBAM_NEG", "MEDIA", "TB", "TBMM"] {
        let a = std::fs::read(first.path().join(format!("{}.tsv", name))).unwrap();
        let b = std::fs::read(second.path().join(format!("{}.tsv", name))).unwrap();
        assert_eq!(a, b, "table {} differs between runs", name);
    }
}

#[test]
fn raising_the_percentile_never_lowers_thresholds() {
    let (_, controls, _, _) = load_inputs();
    let samples: Vec<String> = SAMPLES.iter().map(|s| s.to_string()).collect();

    let low = noise_floor_thresholds(&controls, &samples, 0.25).unwrap();
    let high = noise_floor_thresholds(&controls, &samples, 0.95).unwrap();
    for (lo, hi) in low.iter().zip(high.iter()) {
        assert!(hi >= lo);
    }
}

#[test]
fn config_overrides_change_retention() {
    let (expression, controls, annotation, registry) = load_inputs();

    // at fraction 1.0 the minimum is the full group size
    let config = PipelineConfig {
        retention_fraction: 1.0,
        ..Default::default()
    };
    let (_, report) = Pipeline::with_config(config)
        .unwrap()
        .run(&expression, &controls, &annotation, &registry)
        .unwrap();
    for stats in &report.retention {
        assert_eq!(stats.min_required, stats.n_samples);
    }
}
