//! Fake Store ETL runner.
//! Executes one extract -> transform -> load pass. Scheduling, retries and run
//! logs belong to whatever invokes this binary.

use anyhow::Context;
use fake_store_etl::config::{forced_fallback_from_env, PipelineConfig};
use fake_store_etl::telemetry::init_tracing;
use fake_store_etl::{run_once, HttpProductSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = PipelineConfig::load_default()?.with_forced_fallback(forced_fallback_from_env());
    let source = HttpProductSource::from_config(&cfg).context("building live product source")?;

    let report = run_once(&cfg, &source).await?;
    println!(
        "ETL run complete: {} rows from {:?} source -> {}, {}",
        report.rows,
        report.origin,
        report.parquet_path.display(),
        report.csv_path.display()
    );
    Ok(())
}
