// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! The Parquet / GeoParquet ingestion pipeline.
//!
//! Per file the pipeline walks a fixed set of stages: validate the magic,
//! bootstrap the embedded SQL engine (a process-wide singleton, init once
//! and reused), register the blob under a time-suffixed virtual name, run
//! the capped `SELECT *`, probe the schema for a geometry column, pick a
//! materialization strategy by row and cell count, convert cells by their
//! pre-computed type tag, and unregister the virtual file. Cleanup runs on
//! success and on error alike.
//!

use crate::{
    MyError,
    config::config,
    table::{Field, FieldKind, Table},
    value::Cell,
    wkb::{text_geometry_to_geojson, wkb_to_geojson},
};
use jiff::{Timestamp, tz::TimeZone};
use polars::prelude::*;
use polars::sql::SQLContext;
use std::io::Cursor;
use tokio::sync::{Mutex, OnceCell, mpsc::UnboundedSender};
use tracing::{debug, info, warn};

/// The four-byte prefix of a valid Parquet file.
pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Hard cap on the number of rows one file may materialize.
pub const ROW_CAP: usize = 10_000_000;

/// Column names that mark a file as GeoParquet on their own.
pub const GEO_COLUMN_NAMES: [&str; 5] = ["geometry", "geom", "the_geom", "wkb_geometry", "shape"];

// strategy thresholds: single-pass below, micro-batched up to, worker or
// streaming above.
const SYNC_ROW_LIMIT: usize = 50_000;
const BATCH_ROW_LIMIT: usize = 100_000;
// rough per-cell transfer estimate used to keep worker hand-off bounded.
const WORKER_BYTES_PER_CELL: usize = 50;

/// Progress events `(processed, total)` emitted between batches.
pub type ProgressSender = UnboundedSender<(u64, u64)>;

// the embedded columnar SQL engine. init-once, reused by every load,
// never torn down by this layer.
struct SqlEngine {
    ctx: Mutex<SQLContext>,
}

static ENGINE: OnceCell<SqlEngine> = OnceCell::const_new();

async fn engine() -> Result<&'static SqlEngine, MyError> {
    let secs = config().engine_timeout_secs();
    let init = ENGINE.get_or_init(|| async {
        info!("bootstrapping the embedded SQL engine");
        SqlEngine {
            ctx: Mutex::new(SQLContext::new()),
        }
    });
    tokio::time::timeout(std::time::Duration::from_secs(secs), init)
        .await
        .map_err(|_| MyError::Engine(format!("engine bootstrap timed out after {secs}s").into()))
}

// per-column conversion fast-path tag, derived from the dtype string + the
// column name before any row is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColTag {
    Geometry,
    Array,
    Str,
    Num,
    Bool,
    Date,
    Other,
}

fn geo_name(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    GEO_COLUMN_NAMES.contains(&n.as_str())
        || ["wkb", "geojson", "wkt", "coordinates"]
            .iter()
            .any(|x| n.contains(x))
}

fn tag_for(name: &str, dtype: &DataType, geo: bool) -> ColTag {
    let ts = format!("{dtype:?}").to_ascii_lowercase();
    if geo
        && (geo_name(name)
            || ["geometry", "wkb", "wkt", "blob", "binary"]
                .iter()
                .any(|x| ts.contains(x)))
    {
        return ColTag::Geometry;
    }
    if ts.contains("list") || ts.contains("array") {
        ColTag::Array
    } else if ts.contains("str") {
        ColTag::Str
    } else if ts.contains("int") || ts.contains("float") || ts.contains("decimal") {
        ColTag::Num
    } else if ts.contains("bool") {
        ColTag::Bool
    } else if ts.contains("date") || ts.contains("time") {
        ColTag::Date
    } else {
        ColTag::Other
    }
}

impl From<ColTag> for FieldKind {
    fn from(tag: ColTag) -> Self {
        match tag {
            ColTag::Geometry => FieldKind::Geometry,
            ColTag::Num => FieldKind::Number,
            ColTag::Bool => FieldKind::Boolean,
            ColTag::Date => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }
}

/// Load one Parquet blob into a [`Table`].
///
/// `force_geo` pre-marks the file as GeoParquet; w/o it the schema probe
/// decides. Progress events land on `progress` after every batch of the
/// batched strategies.
pub async fn load_parquet(
    name: &str,
    bytes: Vec<u8>,
    force_geo: bool,
    progress: Option<&ProgressSender>,
) -> Result<Table, MyError> {
    load_parquet_capped(name, bytes, force_geo, progress, ROW_CAP).await
}

// the cap is a parameter so the over-cap failure path stays testable at
// sane fixture sizes.
pub(crate) async fn load_parquet_capped(
    name: &str,
    bytes: Vec<u8>,
    force_geo: bool,
    progress: Option<&ProgressSender>,
    cap: usize,
) -> Result<Table, MyError> {
    if bytes.len() < 4 || &bytes[..4] != PARQUET_MAGIC {
        // still worth attempting; the reader has the final say.
        warn!("'{name}': bytes do not start w/ the PAR1 magic");
    }

    let engine = engine().await?;

    // the blob becomes a data frame before registration; the reader does
    // real work, so it runs on a blocking thread.
    let df = tokio::task::spawn_blocking(move || ParquetReader::new(Cursor::new(bytes)).finish())
        .await
        .map_err(|e| MyError::Internal(format!("parquet read worker: {e}").into()))??;
    let total_rows = df.height();

    let stem = name
        .rsplit('/')
        .next()
        .unwrap_or(name)
        .trim_end_matches(".parquet");
    let vname = format!("{stem}_{}.parquet", Timestamp::now().as_millisecond());
    debug!("registering '{vname}' ({total_rows} rows)");
    {
        let mut ctx = engine.ctx.lock().await;
        ctx.register(&vname, df.lazy());
    }

    let outcome = materialize(engine, &vname, total_rows, force_geo, progress, cap).await;

    // cleanup is unconditional; dropping an already-dropped name is a
    // no-op, which keeps this idempotent.
    {
        let mut ctx = engine.ctx.lock().await;
        ctx.unregister(&vname);
    }
    outcome
}

async fn materialize(
    engine: &SqlEngine,
    vname: &str,
    total_rows: usize,
    force_geo: bool,
    progress: Option<&ProgressSender>,
    cap: usize,
) -> Result<Table, MyError> {
    if total_rows > cap {
        return Err(MyError::Engine(
            format!("'{vname}' w/ {total_rows} rows is too large; try a smaller LIMIT").into(),
        ));
    }

    // schema probe first: column names decide the plain/geo branch.
    let probe = {
        let mut ctx = engine.ctx.lock().await;
        ctx.execute(&format!(r#"SELECT * FROM "{vname}" LIMIT 1"#))?
    }
    .collect()?;
    let names: Vec<String> = probe
        .get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let geo = force_geo || names.iter().any(|n| geo_name(n));
    if geo && !force_geo {
        info!("'{vname}' has a geometry column; taking the GeoParquet branch");
    }
    let tags: Vec<ColTag> = probe
        .get_columns()
        .iter()
        .map(|c| tag_for(c.name(), c.dtype(), geo))
        .collect();

    let frame = {
        let mut ctx = engine.ctx.lock().await;
        ctx.execute(&format!(r#"SELECT * FROM "{vname}" LIMIT {cap}"#))?
    }
    .collect()?;

    let n = frame.height();
    let c = frame.width().max(1);
    let records = if n <= SYNC_ROW_LIMIT {
        convert_range(&frame, &tags, 0, n)
    } else if n <= BATCH_ROW_LIMIT {
        batched(&frame, &tags, progress).await
    } else {
        let estimate = n * c * WORKER_BYTES_PER_CELL;
        if estimate <= config().worker_mem_cap_mb() * 1024 * 1024 {
            worker_streamed(&frame, &tags, progress).await?
        } else {
            debug!("'{vname}': {estimate}B estimate over the worker cap; streaming on-task");
            batched(&frame, &tags, progress).await
        }
    };

    let mut out = Table::new();
    out.fields = names
        .iter()
        .zip(tags.iter())
        .map(|(name, tag)| Field {
            kind: FieldKind::from(*tag),
            ..Field::new(name)
        })
        .collect();
    out.records = records;
    out.sync_summary();
    Ok(out)
}

fn batch_size(cells_per_row: usize) -> usize {
    (10_000_000 / cells_per_row.max(1)).clamp(100_000, 2_000_000)
}

// async micro-batches w/ a cooperative yield in between, so one big file
// cannot starve the scheduler.
async fn batched(
    frame: &DataFrame,
    tags: &[ColTag],
    progress: Option<&ProgressSender>,
) -> Vec<Vec<Cell>> {
    let n = frame.height();
    let batch = batch_size(frame.width().max(1));
    let mut records = Vec::with_capacity(n);
    let mut start = 0;
    while start < n {
        let end = (start + batch).min(n);
        records.extend(convert_range(frame, tags, start, end));
        emit_progress(progress, end, n);
        start = end;
        tokio::task::yield_now().await;
    }
    records
}

// off-task conversion: a blocking worker walks the frame in batches and
// sends each one tagged w/ its start index; this task re-assembles them
// into the pre-allocated row store and awaits the worker before building
// anything. A worker that dies mid-way falls back to on-task streaming.
async fn worker_streamed(
    frame: &DataFrame,
    tags: &[ColTag],
    progress: Option<&ProgressSender>,
) -> Result<Vec<Vec<Cell>>, MyError> {
    let n = frame.height();
    let batch = batch_size(frame.width().max(1));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(usize, Vec<Vec<Cell>>)>();

    let worker_frame = frame.clone();
    let worker_tags = tags.to_vec();
    let handle = tokio::task::spawn_blocking(move || {
        let mut start = 0;
        while start < n {
            let end = (start + batch).min(n);
            let rows = convert_range(&worker_frame, &worker_tags, start, end);
            if tx.send((start, rows)).is_err() {
                return;
            }
            start = end;
        }
    });

    let mut records: Vec<Vec<Cell>> = vec![Vec::new(); n];
    let mut processed = 0usize;
    while let Some((start, rows)) = rx.recv().await {
        processed += rows.len();
        for (k, row) in rows.into_iter().enumerate() {
            records[start + k] = row;
        }
        emit_progress(progress, processed, n);
    }
    if handle.await.is_err() {
        warn!("parquet worker died; falling back to on-task streaming");
        return Ok(batched(frame, tags, progress).await);
    }
    if processed != n {
        return Err(MyError::Internal(
            format!("worker delivered {processed} of {n} rows").into(),
        ));
    }
    Ok(records)
}

fn emit_progress(progress: Option<&ProgressSender>, processed: usize, total: usize) {
    if let Some(tx) = progress {
        let _ = tx.send((processed as u64, total as u64));
    }
}

fn convert_range(frame: &DataFrame, tags: &[ColTag], start: usize, end: usize) -> Vec<Vec<Cell>> {
    let columns: Vec<&Series> = frame
        .get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .collect();
    let mut out = Vec::with_capacity(end - start);
    for i in start..end {
        let row = columns
            .iter()
            .zip(tags.iter())
            .map(|(col, tag)| convert(col.get(i).unwrap_or(AnyValue::Null), *tag))
            .collect();
        out.push(row);
    }
    out
}

fn convert(av: AnyValue, tag: ColTag) -> Cell {
    if matches!(av, AnyValue::Null) {
        return Cell::Null;
    }
    match tag {
        ColTag::Geometry => match av {
            AnyValue::Binary(b) => Cell::Geometry(wkb_to_geojson(b)),
            AnyValue::BinaryOwned(ref b) => Cell::Geometry(wkb_to_geojson(b)),
            AnyValue::String(s) => Cell::Geometry(text_geometry_to_geojson(s)),
            AnyValue::StringOwned(ref s) => Cell::Geometry(text_geometry_to_geojson(s)),
            x => dynamic(x),
        },
        ColTag::Array => match av {
            AnyValue::List(ref s) => Cell::Str(list_json(s).to_string()),
            x => dynamic(x),
        },
        ColTag::Str => match av {
            AnyValue::String(s) => Cell::Str(s.to_owned()),
            AnyValue::StringOwned(s) => Cell::Str(s.to_string()),
            x => dynamic(x),
        },
        ColTag::Num | ColTag::Bool => match numeric(&av) {
            Some(cell) => cell,
            None => dynamic(av),
        },
        ColTag::Date => match temporal(&av) {
            Some(cell) => cell,
            None => dynamic(av),
        },
        ColTag::Other => dynamic(av),
    }
}

fn numeric(av: &AnyValue) -> Option<Cell> {
    match av {
        AnyValue::Boolean(b) => Some(Cell::Bool(*b)),
        AnyValue::Int8(x) => Some(Cell::Num(*x as f64)),
        AnyValue::Int16(x) => Some(Cell::Num(*x as f64)),
        AnyValue::Int32(x) => Some(Cell::Num(*x as f64)),
        AnyValue::Int64(x) => Some(Cell::Num(*x as f64)),
        AnyValue::UInt8(x) => Some(Cell::Num(*x as f64)),
        AnyValue::UInt16(x) => Some(Cell::Num(*x as f64)),
        AnyValue::UInt32(x) => Some(Cell::Num(*x as f64)),
        AnyValue::UInt64(x) => Some(Cell::Num(*x as f64)),
        AnyValue::Float32(x) => Some(Cell::Num(*x as f64)),
        AnyValue::Float64(x) => Some(Cell::Num(*x)),
        _ => None,
    }
}

fn temporal(av: &AnyValue) -> Option<Cell> {
    match av {
        AnyValue::Date(days) => {
            let ts = Timestamp::from_second(i64::from(*days) * 86_400).ok()?;
            Some(Cell::Date(ts.to_zoned(TimeZone::UTC).date().to_string()))
        }
        AnyValue::Datetime(v, tu, _) => datetime_cell(*v, *tu),
        AnyValue::DatetimeOwned(v, tu, _) => datetime_cell(*v, *tu),
        _ => None,
    }
}

fn datetime_cell(v: i64, tu: TimeUnit) -> Option<Cell> {
    let ts = match tu {
        TimeUnit::Milliseconds => Timestamp::from_millisecond(v).ok()?,
        TimeUnit::Microseconds => Timestamp::from_microsecond(v).ok()?,
        TimeUnit::Nanoseconds => Timestamp::from_nanosecond(i128::from(v)).ok()?,
    };
    Some(Cell::Date(ts.to_string()))
}

// runtime type dispatch for untagged/other columns.
fn dynamic(av: AnyValue) -> Cell {
    match av {
        AnyValue::Null => Cell::Null,
        AnyValue::String(s) => Cell::Str(s.to_owned()),
        AnyValue::StringOwned(s) => Cell::Str(s.to_string()),
        AnyValue::Binary(b) => Cell::Geometry(wkb_to_geojson(b)),
        AnyValue::BinaryOwned(ref b) => Cell::Geometry(wkb_to_geojson(b)),
        AnyValue::List(ref s) => Cell::Str(list_json(s).to_string()),
        x => {
            if let Some(cell) = numeric(&x) {
                return cell;
            }
            if let Some(cell) = temporal(&x) {
                return cell;
            }
            Cell::Str(x.to_string())
        }
    }
}

// materialize an engine-native list as a JSON value.
fn list_json(series: &Series) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..series.len())
        .map(|i| match series.get(i).unwrap_or(AnyValue::Null) {
            AnyValue::Null => serde_json::Value::Null,
            AnyValue::Boolean(b) => serde_json::Value::Bool(b),
            AnyValue::String(s) => serde_json::Value::String(s.to_owned()),
            AnyValue::StringOwned(s) => serde_json::Value::String(s.to_string()),
            AnyValue::List(ref inner) => list_json(inner),
            x => match numeric(&x) {
                Some(Cell::Num(f)) => serde_json::Number::from_f64(f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
                _ => serde_json::Value::String(x.to_string()),
            },
        })
        .collect();
    serde_json::Value::Array(items)
}
