// src/extract/mod.rs
//! Source resolution: live product API or the bundled snapshot, persisted as a
//! timestamped raw artifact.

pub mod http;
pub mod types;

use chrono::{Local, NaiveDateTime};
use metrics::counter;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{json_kind, ExtractError};
use crate::extract::types::{FallbackReason, Origin, ProductSource, ResolvedArtifact, Source};
use crate::telemetry::ensure_metrics_described;

/// Pure live/fallback decision.
///
/// `live` is `None` when the live source was not contacted. A forced run always
/// falls back, whatever `live` holds.
pub fn decide_source(forced: bool, live: Option<anyhow::Result<Value>>) -> Source {
    if forced {
        return Source::Fallback(FallbackReason::Forced);
    }
    match live {
        Some(Ok(v @ Value::Array(_))) => Source::Live(v),
        Some(Ok(other)) => Source::Fallback(FallbackReason::LiveFailed(format!(
            "malformed body: expected a JSON array, found {}",
            json_kind(&other)
        ))),
        Some(Err(e)) => Source::Fallback(FallbackReason::LiveFailed(format!("{e:#}"))),
        None => Source::Fallback(FallbackReason::LiveFailed(
            "live source was not attempted".to_string(),
        )),
    }
}

/// Read the version-controlled snapshot. Failure here is fatal: there is no further fallback.
pub fn load_fallback(path: &Path) -> Result<Value, ExtractError> {
    let content = fs::read_to_string(path).map_err(|source| ExtractError::FallbackUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ExtractError::FallbackInvalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `payload` to `<dir>/products_<YYYYMMDD_HHMMSS>.json`, pretty-printed.
///
/// Never overwrites: if the name is taken (two runs in the same second) a
/// `_1`, `_2`, ... suffix is appended.
pub fn write_snapshot(
    dir: &Path,
    payload: &Value,
    at: NaiveDateTime,
) -> Result<PathBuf, ExtractError> {
    let snapshot_err = |path: &Path, source: io::Error| ExtractError::Snapshot {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| snapshot_err(dir, e))?;
    let body = serde_json::to_vec_pretty(payload).map_err(|e| snapshot_err(dir, e.into()))?;

    let stem = format!("products_{}", at.format("%Y%m%d_%H%M%S"));
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.json")
        } else {
            format!("{stem}_{attempt}.json")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                f.write_all(&body)
                    .and_then(|_| f.sync_all())
                    .map_err(|e| snapshot_err(&path, e))?;
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(snapshot_err(&path, e)),
        }
    }
}

/// Decide the source, persist the selected payload, and return the artifact.
///
/// Live failures are logged and recovered here; only a broken fallback snapshot or
/// an unwritable raw directory make this fail.
pub async fn resolve(
    cfg: &PipelineConfig,
    source: &dyn ProductSource,
) -> Result<ResolvedArtifact, ExtractError> {
    ensure_metrics_described();

    let live = if cfg.forced_fallback {
        None
    } else {
        counter!("etl_live_fetch_total").increment(1);
        Some(source.fetch_products().await)
    };

    let (payload, origin) = match decide_source(cfg.forced_fallback, live) {
        Source::Live(v) => {
            info!(provider = source.name(), "using live product listing");
            (v, Origin::Live)
        }
        Source::Fallback(reason) => {
            counter!("etl_fallback_total", "reason" => reason.label()).increment(1);
            match &reason {
                FallbackReason::Forced => info!(
                    path = %cfg.fallback_path.display(),
                    "unattended run, using fallback snapshot"
                ),
                FallbackReason::LiveFailed(why) => warn!(
                    provider = source.name(),
                    error = %why,
                    path = %cfg.fallback_path.display(),
                    "live fetch failed, using fallback snapshot"
                ),
            }
            (load_fallback(&cfg.fallback_path)?, Origin::Fallback)
        }
    };

    let path = write_snapshot(&cfg.raw_dir, &payload, Local::now().naive_local())?;
    info!(path = %path.display(), origin = ?origin, "raw artifact written");
    Ok(ResolvedArtifact { path, origin })
}
