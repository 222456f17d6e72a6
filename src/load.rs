// src/load.rs
//! Curated outputs: `products.parquet` (typed, canonical local file) and
//! `products.csv` (published copy). Both are fully replaced on every run.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use metrics::counter;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::SinkError;
use crate::telemetry::ensure_metrics_described;
use crate::transform::{CuratedDataset, ProductRecord};

pub const PARQUET_FILE: &str = "products.parquet";
pub const CSV_FILE: &str = "products.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutputs {
    pub parquet: PathBuf,
    pub csv: PathBuf,
}

/// Write both curated files under `dir`, creating it if needed.
pub fn write(dataset: &CuratedDataset, dir: &Path) -> Result<SinkOutputs, SinkError> {
    ensure_metrics_described();
    fs::create_dir_all(dir).map_err(|e| SinkError::io(dir, e))?;

    let outputs = SinkOutputs {
        parquet: dir.join(PARQUET_FILE),
        csv: dir.join(CSV_FILE),
    };
    // Both temps must be complete before either target is replaced.
    let parquet_tmp = stage_parquet(dataset, &outputs.parquet)?;
    let csv_tmp = match stage_csv(dataset, &outputs.csv) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&parquet_tmp);
            return Err(e);
        }
    };
    if let Err(e) = commit(&parquet_tmp, &outputs.parquet) {
        let _ = fs::remove_file(&csv_tmp);
        return Err(e);
    }
    commit(&csv_tmp, &outputs.csv)?;

    counter!("etl_rows_written_total").increment(dataset.len() as u64);
    info!(
        rows = dataset.len(),
        parquet = %outputs.parquet.display(),
        csv = %outputs.csv.display(),
        "curated outputs written"
    );
    Ok(outputs)
}

fn schema(dataset: &CuratedDataset) -> Arc<Schema> {
    let mut fields = vec![
        Field::new("id", DataType::Int64, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("price", DataType::Float64, true),
        Field::new("category", DataType::Utf8, true),
        Field::new("rating_rate", DataType::Float64, true),
        Field::new("rating_count", DataType::Float64, true),
        Field::new("price_with_vat", DataType::Float64, true),
    ];
    fields.extend(
        dataset
            .extra_columns
            .iter()
            .map(|c| Field::new(c.as_str(), DataType::Utf8, true)),
    );
    Arc::new(Schema::new(fields))
}

fn f64_column(rows: &[ProductRecord], get: impl Fn(&ProductRecord) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(get).collect::<Vec<_>>()))
}

fn text_column<'a>(
    rows: &'a [ProductRecord],
    get: impl Fn(&'a ProductRecord) -> Option<&'a str>,
) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(get).collect::<Vec<_>>()))
}

/// Columnar view of the dataset, one batch for the whole table.
pub fn to_record_batch(dataset: &CuratedDataset) -> Result<RecordBatch, SinkError> {
    let rows = dataset.rows.as_slice();
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.id).collect::<Vec<_>>())),
        text_column(rows, |r| r.title.as_deref()),
        f64_column(rows, |r| r.price),
        text_column(rows, |r| r.category.as_deref()),
        f64_column(rows, |r| r.rating_rate),
        f64_column(rows, |r| r.rating_count),
        f64_column(rows, |r| r.price_with_vat),
    ];
    for idx in 0..dataset.extra_columns.len() {
        columns.push(text_column(rows, move |r| {
            r.extras.get(idx).and_then(|v| v.as_deref())
        }));
    }
    Ok(RecordBatch::try_new(schema(dataset), columns)?)
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some("fake-store-etl".to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Sibling temp file; renamed over the target once complete so a failed
/// write leaves the previous file in place.
fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.tmp"))
}

/// Fill the temp sibling of `target` without touching `target` itself.
/// The temp file is removed if filling fails.
fn stage_with<F>(target: &Path, fill: F) -> Result<PathBuf, SinkError>
where
    F: FnOnce(File, &Path) -> Result<(), SinkError>,
{
    let tmp = temp_path(target);
    let file = File::create(&tmp).map_err(|e| SinkError::io(&tmp, e))?;
    if let Err(e) = fill(file, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

fn commit(tmp: &Path, target: &Path) -> Result<(), SinkError> {
    fs::rename(tmp, target).map_err(|e| {
        let _ = fs::remove_file(tmp);
        SinkError::io(target, e)
    })
}

fn stage_parquet(dataset: &CuratedDataset, target: &Path) -> Result<PathBuf, SinkError> {
    let batch = to_record_batch(dataset)?;
    stage_with(target, |file, tmp| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?;
        writer.write(&batch)?;
        let file = writer.into_inner()?;
        file.sync_all().map_err(|e| SinkError::io(tmp, e))
    })
}

/// Replace `path` with a Parquet rendering of the dataset.
pub fn write_parquet(dataset: &CuratedDataset, path: &Path) -> Result<(), SinkError> {
    let tmp = stage_parquet(dataset, path)?;
    commit(&tmp, path)
}

/// Plain decimal rendering; `f64` `Display` never switches to exponent form.
fn fmt_f64(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn csv_row(dataset: &CuratedDataset, r: &ProductRecord) -> Vec<String> {
    let mut out = Vec::with_capacity(7 + dataset.extra_columns.len());
    out.push(r.id.map(|i| i.to_string()).unwrap_or_default());
    out.push(r.title.clone().unwrap_or_default());
    out.push(fmt_f64(r.price));
    out.push(r.category.clone().unwrap_or_default());
    out.push(fmt_f64(r.rating_rate));
    out.push(fmt_f64(r.rating_count));
    out.push(fmt_f64(r.price_with_vat));
    out.extend(r.extras.iter().map(|v| v.clone().unwrap_or_default()));
    out
}

fn stage_csv(dataset: &CuratedDataset, target: &Path) -> Result<PathBuf, SinkError> {
    stage_with(target, |file, tmp| {
        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(dataset.columns())?;
        for r in &dataset.rows {
            wtr.write_record(csv_row(dataset, r))?;
        }
        let mut file = wtr
            .into_inner()
            .map_err(|e| SinkError::io(tmp, e.into_error()))?;
        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|e| SinkError::io(tmp, e))
    })
}

/// Header plus one row per record; nulls are empty fields.
pub fn write_csv(dataset: &CuratedDataset, path: &Path) -> Result<(), SinkError> {
    let tmp = stage_csv(dataset, path)?;
    commit(&tmp, path)
}
