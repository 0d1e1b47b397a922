//! Fixed-stage pipeline orchestration, configuration, and reporting.

use crate::collapse::{collapse_genes, merge_retained_probes};
use crate::contrast::{build_contrasts, ContrastSet};
use crate::data::{
    BaseGroup, CohortRegistry, ControlMatrix, ExpressionMatrix, GroupTables, ProbeAnnotation,
};
use crate::error::{GexError, Result};
use crate::filter::{filter_group_retention, noise_floor_thresholds, signal_filter};
use crate::filter::retention::RetentionResult;
use serde::{Deserialize, Serialize};

fn default_percentile() -> f64 {
    0.75
}

fn default_fraction() -> f64 {
    0.75
}

fn default_stim_label() -> String {
    "TB".to_string()
}

fn default_diff_label() -> String {
    "TBMM".to_string()
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Percentile of negative-control intensities defining the noise floor.
    #[serde(default = "default_percentile")]
    pub control_percentile: f64,
    /// Minimum present-sample fraction per group to retain a probe.
    #[serde(default = "default_fraction")]
    pub retention_fraction: f64,
    /// Condition label of stimulated samples within sample IDs.
    #[serde(default = "default_stim_label")]
    pub stim_label: String,
    /// Replacement label for difference-table columns.
    #[serde(default = "default_diff_label")]
    pub diff_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            control_percentile: default_percentile(),
            retention_fraction: default_fraction(),
            stim_label: default_stim_label(),
            diff_label: default_diff_label(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(GexError::from)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.control_percentile) {
            return Err(GexError::InvalidParameter(
                "control_percentile must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retention_fraction) {
            return Err(GexError::InvalidParameter(
                "retention_fraction must be between 0 and 1".to_string(),
            ));
        }
        if self.stim_label.is_empty() || self.diff_label.is_empty() {
            return Err(GexError::InvalidParameter(
                "condition labels must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Sample IDs in expression-matrix column order.
    pub samples: Vec<String>,
    /// Per-sample log2 detection thresholds, parallel to `samples`.
    pub thresholds: Vec<f64>,
    /// Retention statistics per base group, in group order.
    pub retention: Vec<RetentionResult>,
    /// Probes surviving the union merge.
    pub n_union_probes: usize,
    /// Genes in the collapsed matrix.
    pub n_genes: usize,
    /// Non-fatal degenerate conditions encountered during the run.
    pub warnings: Vec<String>,
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pipeline Report")?;
        writeln!(f, "===============")?;
        writeln!(f)?;
        writeln!(f, "Thresholds (log2):")?;
        for (sample, threshold) in self.samples.iter().zip(&self.thresholds) {
            writeln!(f, "  {}\t{:.4}", sample, threshold)?;
        }
        writeln!(f)?;
        for stats in &self.retention {
            write!(f, "{}", stats)?;
        }
        writeln!(f)?;
        writeln!(f, "Union probes: {}", self.n_union_probes)?;
        writeln!(f, "Genes:        {}", self.n_genes)?;
        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  - {}", warning)?;
            }
        }
        Ok(())
    }
}

/// The fixed seven-stage contrast pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with the given configuration.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages on the given inputs.
    ///
    /// `expression` must be on the log2 scale, as produced by the upstream
    /// normalization step; final tables come out on the linear scale.
    pub fn run(
        &self,
        expression: &ExpressionMatrix,
        controls: &ControlMatrix,
        annotation: &ProbeAnnotation,
        registry: &CohortRegistry,
    ) -> Result<(ContrastSet, PipelineReport)> {
        self.config.validate()?;
        registry
            .validate_against(expression.sample_ids())
            .map_err(|e| stage_error("cohort registry", e))?;

        let thresholds = noise_floor_thresholds(
            controls,
            expression.sample_ids(),
            self.config.control_percentile,
        )
        .map_err(|e| stage_error("noise floor", e))?;

        let filtered = signal_filter(expression, &thresholds)
            .map_err(|e| stage_error("signal filter", e))?;

        let group_columns = registry.group_indices(expression.sample_ids())?;
        let mut warnings = Vec::new();
        let retention = GroupTables::try_from_fn(|group| {
            filter_group_retention(
                &filtered.masked,
                group.label(),
                group_columns.get(group),
                self.config.retention_fraction,
            )
            .map_err(|e| stage_error("group retention", e))
        })?;
        for group in BaseGroup::ALL {
            let result = retention.get(group);
            if result.stats.n_samples == 0 {
                warnings.push(format!("Group {} has no samples", group));
            } else if result.retained.is_empty() {
                warnings.push(format!(
                    "Every probe failed retention filtering in group {}",
                    group
                ));
            }
        }

        let retained_sets = GroupTables::from_fn(|group| retention.get(group).retained.clone());
        let merged = merge_retained_probes(&filtered.backup, &retained_sets)
            .map_err(|e| stage_error("probe-set merge", e))?;
        if merged.n_probes() == 0 {
            warnings.push("No probe passed retention filtering in any group".to_string());
        }

        let collapsed = collapse_genes(&merged, annotation)
            .map_err(|e| stage_error("gene collapse", e))?;

        let contrasts = build_contrasts(
            &collapsed,
            registry,
            &self.config.stim_label,
            &self.config.diff_label,
        )
        .map_err(|e| stage_error("contrast assembly", e))?;

        let report = PipelineReport {
            samples: expression.sample_ids().to_vec(),
            thresholds,
            retention: BaseGroup::ALL
                .into_iter()
                .map(|g| retention.get(g).stats.clone())
                .collect(),
            n_union_probes: merged.n_probes(),
            n_genes: collapsed.n_probes(),
            warnings,
        };

        Ok((contrasts, report))
    }
}

fn stage_error(stage: &str, error: GexError) -> GexError {
    GexError::Pipeline(format!("Stage '{}' failed: {}", stage, error))
}
