// src/pipeline.rs
use anyhow::{Context, Result};
use metrics::gauge;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::PipelineConfig;
use crate::extract::{self, types::Origin, types::ProductSource};
use crate::load;
use crate::telemetry::ensure_metrics_described;
use crate::transform;

/// What one run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub origin: Origin,
    pub raw_path: PathBuf,
    pub rows: usize,
    pub parquet_path: PathBuf,
    pub csv_path: PathBuf,
}

/// resolve -> normalize -> write, strictly in sequence. Any stage error aborts
/// the run before later stages touch their outputs.
pub async fn run_once(cfg: &PipelineConfig, source: &dyn ProductSource) -> Result<RunReport> {
    ensure_metrics_described();

    let artifact = extract::resolve(cfg, source)
        .await
        .context("extract stage failed")?;

    let dataset = transform::normalize(&artifact.path)
        .with_context(|| format!("transform stage failed for {}", artifact.path.display()))?;

    let outputs = load::write(&dataset, &cfg.curated_dir).context("load stage failed")?;

    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("etl_last_run_ts").set(now as f64);

    let report = RunReport {
        origin: artifact.origin,
        raw_path: artifact.path,
        rows: dataset.len(),
        parquet_path: outputs.parquet,
        csv_path: outputs.csv,
    };
    info!(
        origin = ?report.origin,
        rows = report.rows,
        "pipeline completed"
    );
    Ok(report)
}
