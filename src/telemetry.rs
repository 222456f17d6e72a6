// src/telemetry.rs
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "fake_store_etl=info,warn";

/// One-time metrics registration so series show up in whatever recorder the scheduler installs.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("etl_live_fetch_total", "Live product API calls attempted.");
        describe_counter!(
            "etl_fallback_total",
            "Runs that used the bundled snapshot, labelled by reason."
        );
        describe_counter!("etl_records_in_total", "Raw records read by the normalizer.");
        describe_counter!(
            "etl_duplicates_dropped_total",
            "Rows removed by id deduplication."
        );
        describe_counter!("etl_rows_written_total", "Curated rows persisted.");
        describe_gauge!("etl_last_run_ts", "Unix ts when the pipeline last completed.");
    });
}

/// Compact fmt logs filtered by `RUST_LOG` (defaults to `fake_store_etl=info,warn`).
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
