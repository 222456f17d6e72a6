// src/extract/types.rs
use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;

/// Something that can produce the live product listing.
#[async_trait::async_trait]
pub trait ProductSource: Send + Sync {
    /// One attempt, no retries. Any error sends the run to the fallback snapshot.
    async fn fetch_products(&self) -> Result<Value>;
    fn name(&self) -> &'static str;
}

/// Outcome of the live/fallback decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Live body, already checked to be a JSON array.
    Live(Value),
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Unattended run; the live source was never contacted.
    Forced,
    /// Network error, non-2xx, timeout, or a body that is not a JSON array.
    LiveFailed(String),
}

impl FallbackReason {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::Forced => "forced",
            FallbackReason::LiveFailed(_) => "live_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    Fallback,
}

/// Where `resolve` put the raw payload, and which source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub path: PathBuf,
    pub origin: Origin,
}
