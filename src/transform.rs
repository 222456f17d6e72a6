// src/transform.rs
//! Raw payload -> curated product table.
//!
//! Records are flattened (nested objects become `parent.child` keys), column names
//! are canonicalized, the six contract columns are guaranteed, numeric and text
//! columns are coerced without ever failing on bad values, `price_with_vat` is
//! derived, and duplicate ids are dropped keeping the first row.

use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{json_kind, NormalizeError};
use crate::telemetry::ensure_metrics_described;

/// Columns every curated table has, in output order.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "id",
    "title",
    "price",
    "category",
    "rating_rate",
    "rating_count",
];
pub const DERIVED_COLUMN: &str = "price_with_vat";
pub const VAT_MULTIPLIER: f64 = 1.20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub rating_rate: Option<f64>,
    pub rating_count: Option<f64>,
    pub price_with_vat: Option<f64>,
    /// Pass-through columns as text, aligned with [`CuratedDataset::extra_columns`].
    pub extras: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CuratedDataset {
    /// Non-contract columns (e.g. `description`, `image`) in first-seen order.
    pub extra_columns: Vec<String>,
    pub rows: Vec<ProductRecord>,
}

impl CuratedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Full header: contract columns, derived column, then extras.
    pub fn columns(&self) -> Vec<&str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .chain(std::iter::once(DERIVED_COLUMN))
            .chain(self.extra_columns.iter().map(String::as_str))
            .collect()
    }

    /// Value of a pass-through column for one row.
    pub fn extra<'a>(&self, row: &'a ProductRecord, column: &str) -> Option<&'a str> {
        let idx = self.extra_columns.iter().position(|c| c == column)?;
        row.extras.get(idx)?.as_deref()
    }
}

/// Read a raw artifact and normalize it.
pub fn normalize(artifact: &Path) -> Result<CuratedDataset, NormalizeError> {
    let content = fs::read_to_string(artifact).map_err(|source| NormalizeError::Read {
        path: artifact.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&content)?;
    let out = normalize_payload(&payload)?;
    info!(
        path = %artifact.display(),
        rows = out.len(),
        "normalized raw artifact"
    );
    Ok(out)
}

/// Normalize an in-memory payload. Fails only when it is not an array of objects.
pub fn normalize_payload(payload: &Value) -> Result<CuratedDataset, NormalizeError> {
    ensure_metrics_described();

    let records = payload.as_array().ok_or(NormalizeError::NotArray {
        found: json_kind(payload),
    })?;

    let mut flat_records = Vec::with_capacity(records.len());
    for (index, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or(NormalizeError::NotObject {
            index,
            found: json_kind(rec),
        })?;
        flat_records.push(canonical_record(obj));
    }

    let extra_columns = collect_extra_columns(&flat_records);
    debug!(extras = ?extra_columns, "pass-through columns");

    let mut seen: HashSet<IdKey> = HashSet::with_capacity(flat_records.len());
    let mut rows = Vec::with_capacity(flat_records.len());
    for rec in &flat_records {
        if !seen.insert(IdKey::of(rec.get("id"))) {
            continue;
        }
        rows.push(build_row(rec, &extra_columns));
    }

    let dropped = flat_records.len() - rows.len();
    counter!("etl_records_in_total").increment(flat_records.len() as u64);
    counter!("etl_duplicates_dropped_total").increment(dropped as u64);
    if dropped > 0 {
        debug!(dropped, "duplicate ids removed");
    }

    Ok(CuratedDataset {
        extra_columns,
        rows,
    })
}

/// Flatten nested objects into `parent.child` keys. Arrays stay whole; empty
/// nested objects contribute nothing.
pub fn flatten_record(obj: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::with_capacity(obj.len());
    flatten_into("", obj, &mut out);
    out
}

fn flatten_into(prefix: &str, obj: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (k, v) in obj {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            Value::Object(inner) => flatten_into(&key, inner, out),
            other => out.push((key, other.clone())),
        }
    }
}

/// Trim, lowercase, and turn spaces and dots into underscores.
pub fn canonical_column(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '.'], "_")
}

fn canonical_record(obj: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in flatten_record(obj) {
        // first key wins when two source keys collapse to one column
        out.entry(canonical_column(&k)).or_insert(v);
    }
    out
}

fn is_contract_column(name: &str) -> bool {
    name == DERIVED_COLUMN || REQUIRED_COLUMNS.contains(&name)
}

fn collect_extra_columns(records: &[Map<String, Value>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut cols = Vec::new();
    for rec in records {
        for k in rec.keys() {
            if !is_contract_column(k) && seen.insert(k.as_str()) {
                cols.push(k.clone());
            }
        }
    }
    cols
}

/// Dedup key. Ids that coerce to an integer compare by that integer, so the
/// emitted `id` column stays unique; anything else compares by its raw JSON
/// text. Missing and null share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdKey {
    Missing,
    Int(i64),
    Other(String),
}

impl IdKey {
    fn of(v: Option<&Value>) -> Self {
        match v {
            None | Some(Value::Null) => IdKey::Missing,
            Some(raw) => match coerce_id(Some(raw)) {
                Some(i) => IdKey::Int(i),
                None => IdKey::Other(raw.to_string()),
            },
        }
    }
}

fn build_row(rec: &Map<String, Value>, extra_columns: &[String]) -> ProductRecord {
    let price = coerce_numeric(rec.get("price"));
    ProductRecord {
        id: coerce_id(rec.get("id")),
        title: coerce_text(rec.get("title")),
        price,
        category: coerce_text(rec.get("category")),
        rating_rate: coerce_numeric(rec.get("rating_rate")),
        rating_count: coerce_numeric(rec.get("rating_count")),
        price_with_vat: vat_price(price),
        extras: extra_columns
            .iter()
            .map(|c| coerce_text(rec.get(c)))
            .collect(),
    }
}

/// Numbers and numeric strings become `f64`; everything else, including
/// non-finite values, becomes `None`.
pub fn coerce_numeric(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Integers, integral floats, and integer strings become ids.
pub fn coerce_id(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Strings as-is, scalars via their JSON text, arrays/objects as compact JSON.
pub fn coerce_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `round(price * 1.20, 2)` with half-to-even rounding; `None` propagates.
pub fn vat_price(price: Option<f64>) -> Option<f64> {
    price.map(|p| (p * VAT_MULTIPLIER * 100.0).round_ties_even() / 100.0)
}
