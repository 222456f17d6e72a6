// tests/extract_resolve.rs
//
// Source resolution with mock providers: forced fallback, live success,
// live failure recovery, and the fatal broken-snapshot cases.

use anyhow::Result;
use async_trait::async_trait;
use fake_store_etl::error::ExtractError;
use fake_store_etl::extract::resolve;
use fake_store_etl::extract::types::{Origin, ProductSource};
use fake_store_etl::PipelineConfig;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

enum Behavior {
    Ok(Value),
    Fail(&'static str),
}

struct MockSource {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductSource for MockSource {
    async fn fetch_products(&self) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Ok(v) => Ok(v.clone()),
            Behavior::Fail(why) => Err(anyhow::anyhow!(*why)),
        }
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

fn seed() -> Value {
    json!([{"id": 100, "title": "Seed", "price": 1.5}])
}

fn test_config(root: &Path, forced: bool) -> PipelineConfig {
    let fallback = root.join("products_seed.json");
    fs::write(&fallback, serde_json::to_string(&seed()).unwrap()).unwrap();
    PipelineConfig {
        fallback_path: fallback,
        raw_dir: root.join("data").join("raw"),
        curated_dir: root.join("data").join("curated"),
        forced_fallback: forced,
        ..PipelineConfig::default()
    }
}

fn read_json(p: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap()
}

#[tokio::test]
async fn forced_mode_never_contacts_live_source() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), true);
    let src = MockSource::new(Behavior::Ok(json!([{"id": 1}])));

    let art = resolve(&cfg, &src).await.expect("resolve");
    assert_eq!(src.calls(), 0);
    assert_eq!(art.origin, Origin::Fallback);
    assert_eq!(read_json(&art.path), seed());
}

#[tokio::test]
async fn live_payload_is_persisted_when_fetch_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), false);
    let live = json!([{"id": 7, "title": "Live", "rating": {"rate": 4.0, "count": 3}}]);
    let src = MockSource::new(Behavior::Ok(live.clone()));

    let art = resolve(&cfg, &src).await.expect("resolve");
    assert_eq!(src.calls(), 1);
    assert_eq!(art.origin, Origin::Live);
    assert!(art.path.starts_with(&cfg.raw_dir));
    let name = art.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("products_") && name.ends_with(".json"), "{name}");
    assert_eq!(read_json(&art.path), live);
}

#[tokio::test]
async fn live_failure_falls_back_without_error() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), false);
    let src = MockSource::new(Behavior::Fail("operation timed out"));

    let art = resolve(&cfg, &src).await.expect("fallback must not raise");
    assert_eq!(src.calls(), 1);
    assert_eq!(art.origin, Origin::Fallback);
    assert_eq!(read_json(&art.path), seed());
}

#[tokio::test]
async fn non_array_live_body_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), false);
    let src = MockSource::new(Behavior::Ok(json!({"message": "blocked"})));

    let art = resolve(&cfg, &src).await.expect("resolve");
    assert_eq!(art.origin, Origin::Fallback);
    assert_eq!(read_json(&art.path), seed());
}

#[tokio::test]
async fn consecutive_runs_never_overwrite_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), true);
    let src = MockSource::new(Behavior::Fail("unused"));

    let a = resolve(&cfg, &src).await.unwrap();
    let b = resolve(&cfg, &src).await.unwrap();
    assert_ne!(a.path, b.path);
    assert!(a.path.exists() && b.path.exists());
}

#[tokio::test]
async fn missing_snapshot_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_config(tmp.path(), true);
    cfg.fallback_path = tmp.path().join("nope.json");
    let src = MockSource::new(Behavior::Fail("unused"));

    let err = resolve(&cfg, &src).await.unwrap_err();
    assert!(matches!(err, ExtractError::FallbackUnreadable { .. }), "{err:?}");
    assert!(!cfg.raw_dir.exists(), "no artifact should be written");
}

#[tokio::test]
async fn invalid_snapshot_is_fatal_after_live_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = test_config(tmp.path(), false);
    fs::write(&cfg.fallback_path, "[{broken").unwrap();
    let src = MockSource::new(Behavior::Fail("connection refused"));

    let err = resolve(&cfg, &src).await.unwrap_err();
    assert!(matches!(err, ExtractError::FallbackInvalid { .. }), "{err:?}");
}

#[tokio::test]
async fn broken_snapshot_is_irrelevant_when_live_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = test_config(tmp.path(), false);
    cfg.fallback_path = tmp.path().join("missing.json");
    let src = MockSource::new(Behavior::Ok(json!([])));

    let art = resolve(&cfg, &src).await.expect("resolve");
    assert_eq!(art.origin, Origin::Live);
}
