// src/lib.rs
// Public library surface for the runner and integration tests.

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod pipeline;
pub mod telemetry;
pub mod transform;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::extract::http::HttpProductSource;
pub use crate::extract::types::{FallbackReason, Origin, ProductSource, Source};
pub use crate::extract::{decide_source, resolve};
pub use crate::load::write;
pub use crate::pipeline::{run_once, RunReport};
pub use crate::transform::{normalize, CuratedDataset, ProductRecord};
