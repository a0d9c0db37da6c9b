//! Report command: merge checkpoints and compute metrics with completeness.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, info_span, warn};

use gridver_metrics::CompletenessReport;
use gridver_workflow::{Checkpoint, PassAccumulators, PassMetrics, WarningCategory, WarningLog};

use crate::cli::ReportArgs;
use crate::config::GridverConfig;
use crate::convert;

/// What `gridver report` writes.
#[derive(Debug, Serialize)]
pub struct Report {
    pub variable: String,
    pub groups: Vec<String>,
    pub thresholds: Vec<f64>,
    pub n_checkpoints: usize,
    pub metrics: PassMetrics,
    pub completeness: Vec<CompletenessReport>,
    pub warning_counts: BTreeMap<WarningCategory, usize>,
    pub warnings: WarningLog,
}

/// Merges `checkpoints` and computes the configured metrics.
pub fn build_report(config: &GridverConfig, checkpoints: &[Checkpoint]) -> Result<Report> {
    let Some(first) = checkpoints.first() else {
        bail!("no checkpoints to report on");
    };
    let variable = first.variable.clone();
    if variable != config.verification.variable {
        warn!(
            checkpoint = %variable,
            config = %config.verification.variable,
            "checkpoint variable differs from configured variable"
        );
    }

    let mut pass = PassAccumulators::new(&first.thresholds);
    let mut warnings = WarningLog::new();
    let mut groups: Vec<String> = Vec::new();
    for checkpoint in checkpoints {
        if checkpoint.variable != variable {
            bail!(
                "cannot merge checkpoints of different variables: {} and {}",
                variable,
                checkpoint.variable
            );
        }
        let restored = checkpoint
            .to_pass()
            .with_context(|| format!("corrupt checkpoint {}", checkpoint.checkpoint_id()))?;
        pass.merge(&restored)
            .with_context(|| format!("cannot merge checkpoint {}", checkpoint.checkpoint_id()))?;
        warnings.extend(checkpoint.warnings.clone());
        let group = checkpoint.group.to_string();
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    let calculator = convert::build_calculator(&config.verification)?;
    let completeness_config = convert::build_completeness_config(&config.completeness)?;
    let metrics = pass.compute_metrics_with(&calculator);
    let completeness = metrics.completeness(&completeness_config);
    for report in completeness.iter().filter(|r| !r.is_complete()) {
        warnings.record(
            WarningCategory::SampleCount,
            format!(
                "{} of {} {} entities have fewer than {} samples",
                report.summary.insufficient_count,
                report.summary.total_entities,
                report.kind,
                report.min_samples
            ),
            BTreeMap::new(),
        );
    }

    Ok(Report {
        variable,
        groups,
        thresholds: pass.thresholds().to_vec(),
        n_checkpoints: checkpoints.len(),
        metrics,
        completeness,
        warning_counts: warnings.counts(),
        warnings,
    })
}

fn read_checkpoint(path: &Path) -> Result<Checkpoint> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read checkpoint: {}", path.display()))?;
    Checkpoint::from_bytes(&bytes)
        .with_context(|| format!("failed to decode checkpoint: {}", path.display()))
}

/// Run the report command.
pub fn run(args: ReportArgs) -> Result<()> {
    let _cmd = info_span!("report").entered();
    let config = GridverConfig::from_path(&args.config)?;

    let checkpoints = args
        .checkpoints
        .iter()
        .map(|path| read_checkpoint(path))
        .collect::<Result<Vec<_>>>()?;
    info!(n_checkpoints = checkpoints.len(), "checkpoints loaded");

    let report = build_report(&config, &checkpoints)?;
    info!(
        n_gridpoints = report.metrics.gridpoints.len(),
        n_regions = report.metrics.regions.len(),
        n_stations = report.metrics.stations.len(),
        "metrics computed"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to serialise report")?;
    let report_path = match args.output {
        Some(path) => path,
        // Auto-derive: foo.json -> foo.report.json
        None => args.checkpoints[0].with_extension("report.json"),
    };
    std::fs::write(&report_path, json)
        .with_context(|| format!("failed to write report: {}", report_path.display()))?;
    info!(path = %report_path.display(), "report written");

    Ok(())
}
