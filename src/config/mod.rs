// src/config/mod.rs
pub mod pipeline;

pub use pipeline::{forced_fallback_from_env, parse_flag, PipelineConfig};
