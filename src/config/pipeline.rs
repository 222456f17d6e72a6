// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Points at an explicit TOML config file; wins over `config/pipeline.toml`.
pub const ENV_CONFIG_PATH: &str = "ETL_CONFIG_PATH";
/// Set by scheduled CI runners; any truthy value forces the bundled snapshot.
pub const ENV_UNATTENDED: &str = "GITHUB_ACTIONS";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

pub const DEFAULT_PRODUCTS_URL: &str = "https://fakestoreapi.com/products";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_products_url() -> String {
    DEFAULT_PRODUCTS_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_accept() -> String {
    "application/json".to_string()
}
fn default_fallback_path() -> PathBuf {
    PathBuf::from("sample_data/products_seed.json")
}
fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_curated_dir() -> PathBuf {
    PathBuf::from("data/curated")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Product-listing endpoint, expected to return a JSON array.
    #[serde(default = "default_products_url")]
    pub products_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    /// Version-controlled snapshot used when the live source is skipped or fails.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: PathBuf,
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_curated_dir")]
    pub curated_dir: PathBuf,
    /// Never contact the live source.
    #[serde(default)]
    pub forced_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            products_url: default_products_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            fallback_path: default_fallback_path(),
            raw_dir: default_raw_dir(),
            curated_dir: default_curated_dir(),
            forced_fallback: false,
        }
    }
}

impl PipelineConfig {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let mut cfg: PipelineConfig = toml::from_str(&data)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;

        // Zero would make every live call time out immediately
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        Ok(cfg)
    }

    /// Load config using env var + fallbacks:
    /// 1) $ETL_CONFIG_PATH
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Fold the unattended-execution signal into the config.
    pub fn with_forced_fallback(mut self, forced: bool) -> Self {
        self.forced_fallback = self.forced_fallback || forced;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.curated_dir.join("products.parquet")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.curated_dir.join("products.csv")
    }
}

/// Boolean-like env parsing: 1/true/yes/on, case-insensitive.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Reads `$GITHUB_ACTIONS`. Only the runner calls this; library code takes the flag as input.
pub fn forced_fallback_from_env() -> bool {
    std::env::var(ENV_UNATTENDED)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_accepts_common_truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(parse_flag(v), "{v:?} should be truthy");
        }
        for v in ["", "0", "false", "no", "maybe"] {
            assert!(!parse_flag(v), "{v:?} should be falsy");
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PipelineConfig = toml::from_str(r#"raw_dir = "/tmp/raw""#).unwrap();
        assert_eq!(cfg.raw_dir, PathBuf::from("/tmp/raw"));
        assert_eq!(cfg.products_url, DEFAULT_PRODUCTS_URL);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(!cfg.forced_fallback);
    }

    #[test]
    fn forced_fallback_is_sticky() {
        let cfg = PipelineConfig {
            forced_fallback: true,
            ..PipelineConfig::default()
        };
        assert!(cfg.clone().with_forced_fallback(false).forced_fallback);
        assert!(PipelineConfig::default()
            .with_forced_fallback(true)
            .forced_fallback);
    }

    #[test]
    fn curated_paths_are_fixed_names() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.parquet_path(), PathBuf::from("data/curated/products.parquet"));
        assert_eq!(cfg.csv_path(), PathBuf::from("data/curated/products.csv"));
    }
}
