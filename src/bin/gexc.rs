//! gexc - Gene expression contrast CLI
//!
//! Command-line interface for building cohort contrast tables from
//! normalized microarray data.

use clap::{Parser, Subcommand};
use gex_contrast::data::{CohortRegistry, ControlMatrix, ExpressionMatrix, ProbeAnnotation};
use gex_contrast::error::Result;
use gex_contrast::pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;

/// Gene-level contrast tables from normalized microarray intensities
#[derive(Parser)]
#[command(name = "gexc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the contrast pipeline on TSV inputs
    Run {
        /// Path to the log2-scale expression matrix TSV
        #[arg(short, long)]
        expression: PathBuf,

        /// Path to the control-probe matrix TSV
        #[arg(short = 'c', long)]
        controls: PathBuf,

        /// Path to the probe-to-gene annotation TSV
        #[arg(short, long)]
        annotation: PathBuf,

        /// Path to the sample-to-cohort lookup TSV
        #[arg(short = 'g', long)]
        cohorts: PathBuf,

        /// Output directory for the five contrast tables
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Optional pipeline configuration YAML
        #[arg(long)]
        config: Option<PathBuf>,

        /// Percentile of negative-control intensities for the noise floor
        #[arg(long)]
        control_percentile: Option<f64>,

        /// Minimum present-sample fraction per group to retain a probe
        #[arg(long)]
        retention_fraction: Option<f64>,

        /// Report format: text or json
        #[arg(long, default_value = "text")]
        report_format: String,
    },

    /// Write a default pipeline configuration YAML
    ExampleConfig {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "gexc.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            expression,
            controls,
            annotation,
            cohorts,
            out_dir,
            config,
            control_percentile,
            retention_fraction,
            report_format,
        } => cmd_run(
            &expression,
            &controls,
            &annotation,
            &cohorts,
            &out_dir,
            config.as_ref(),
            control_percentile,
            retention_fraction,
            &report_format,
        ),

        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the contrast pipeline
#[allow(clippy::too_many_arguments)]
fn cmd_run(
    expression_path: &PathBuf,
    controls_path: &PathBuf,
    annotation_path: &PathBuf,
    cohorts_path: &PathBuf,
    out_dir: &PathBuf,
    config_path: Option<&PathBuf>,
    control_percentile: Option<f64>,
    retention_fraction: Option<f64>,
    report_format: &str,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            eprintln!("Loading pipeline configuration from {:?}...", path);
            let config_str = std::fs::read_to_string(path)?;
            PipelineConfig::from_yaml(&config_str)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(p) = control_percentile {
        config.control_percentile = p;
    }
    if let Some(f) = retention_fraction {
        config.retention_fraction = f;
    }

    eprintln!("Loading data...");
    let expression = ExpressionMatrix::from_tsv(expression_path)?;
    let controls = ControlMatrix::from_tsv(controls_path)?;
    let annotation = ProbeAnnotation::from_tsv(annotation_path)?;
    let registry = CohortRegistry::from_tsv(cohorts_path)?;

    eprintln!(
        "Loaded {} probes x {} samples ({} control probes, {} registered samples)",
        expression.n_probes(),
        expression.n_samples(),
        controls.n_probes(),
        registry.n_samples()
    );

    eprintln!("Running contrast pipeline...");
    eprintln!("  Control percentile:  {:.2}", config.control_percentile);
    eprintln!("  Retention fraction:  {:.2}", config.retention_fraction);

    let pipeline = Pipeline::with_config(config)?;
    let (contrasts, report) = pipeline.run(&expression, &controls, &annotation, &registry)?;

    eprintln!("Writing contrast tables to {:?}...", out_dir);
    contrasts.write_all(out_dir)?;

    match report_format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{}", report),
    }

    eprintln!(
        "Done! {} genes across {} tables",
        report.n_genes,
        contrasts.tables().len()
    );
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }

    Ok(())
}

/// Write a default configuration YAML
fn cmd_example_config(output_path: &PathBuf) -> Result<()> {
    let yaml = PipelineConfig::default().to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);
    Ok(())
}
