// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Groups the parsers turning heterogeneous sources --tabular text, JSON
//! trees, XML feeds, Parquet blobs-- into the uniform 2-D cell array the
//! [`Table`] store is built from.
//!

mod csv;
mod geojson;
mod json;
mod parquet;
mod xml;

pub use parquet::{GEO_COLUMN_NAMES, PARQUET_MAGIC, ProgressSender, ROW_CAP, load_parquet};

use crate::{MyError, table::Table};
use core::fmt;
use std::{
    collections::HashMap,
    str::FromStr,
    sync::{OnceLock, RwLock},
};
use tracing::debug;

/// The source kinds this library understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Delimiter-separated text.
    Csv,
    /// A JSON tree w/ tabular content somewhere inside.
    Json,
    /// A GeoJSON feature collection.
    GeoJson,
    /// A TopoJSON topology; converted to GeoJSON on the way in.
    TopoJson,
    /// KML placemarks.
    Kml,
    /// GML feature members.
    Gml,
    /// An RSS channel.
    Rss,
    /// JSONstat; served by an externally registered parser.
    JsonStat,
    /// The library's own persisted table shape.
    JsonDb,
    /// A Parquet blob.
    Parquet,
    /// A Parquet blob w/ a geometry column.
    GeoParquet,
}

impl FromStr for SourceKind {
    type Err = MyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            "json" => Ok(SourceKind::Json),
            "geojson" => Ok(SourceKind::GeoJson),
            "topojson" => Ok(SourceKind::TopoJson),
            "kml" => Ok(SourceKind::Kml),
            "gml" => Ok(SourceKind::Gml),
            "rss" => Ok(SourceKind::Rss),
            "jsonstat" => Ok(SourceKind::JsonStat),
            "jsondb" => Ok(SourceKind::JsonDb),
            "parquet" => Ok(SourceKind::Parquet),
            "geoparquet" => Ok(SourceKind::GeoParquet),
            x => Err(MyError::Format(format!("unknown source kind '{x}'").into())),
        }
    }
}

// the Display form is the accepted input form.
impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Csv => "csv",
            SourceKind::Json => "json",
            SourceKind::GeoJson => "geojson",
            SourceKind::TopoJson => "topojson",
            SourceKind::Kml => "kml",
            SourceKind::Gml => "gml",
            SourceKind::Rss => "rss",
            SourceKind::JsonStat => "jsonstat",
            SourceKind::JsonDb => "jsondb",
            SourceKind::Parquet => "parquet",
            SourceKind::GeoParquet => "geoparquet",
        };
        write!(f, "{s}")
    }
}

impl SourceKind {
    /// TRUE for kinds whose sources are binary blobs.
    pub fn is_binary(&self) -> bool {
        matches!(self, SourceKind::Parquet | SourceKind::GeoParquet)
    }
}

/// Options steering the individual parsers; every field is optional.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// CSV delimiter; `None` probes `,` then `;`.
    pub delimiter: Option<u8>,
    /// Skip rows w/o a single populated cell (CSV).
    pub skip_empty_lines: bool,
    /// Name of the object to pick out of a TopoJSON container.
    pub name: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            skip_empty_lines: true,
            name: None,
        }
    }
}

/// A parser turning source text into the 2-D cell array (header first).
pub type RowParser = fn(&str, &ParserOptions) -> Result<Vec<Vec<String>>, MyError>;

static REGISTRY: OnceLock<RwLock<HashMap<String, RowParser>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, RowParser>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register (or replace) an external parser for a source kind. This is how
/// collaborators like the JSONstat adapter plug in.
pub fn register_parser(kind: &str, parser: RowParser) {
    if let Ok(mut guard) = registry().write() {
        guard.insert(kind.to_ascii_lowercase(), parser);
    }
}

fn registered(kind: SourceKind) -> Option<RowParser> {
    registry()
        .read()
        .ok()
        .and_then(|g| g.get(&kind.to_string()).copied())
}

// what a text/object parse produced: most kinds yield rows for
// `Table::from_rows`, jsondb rebuilds the table w/ its field metadata.
pub(crate) enum Parsed {
    Rows(Vec<Vec<String>>),
    Table(Table),
}

impl Parsed {
    pub(crate) fn into_table(self) -> Table {
        match self {
            Parsed::Rows(rows) => Table::from_rows(&rows),
            Parsed::Table(t) => t,
        }
    }

    pub(crate) fn into_rows(self) -> Vec<Vec<String>> {
        match self {
            Parsed::Rows(rows) => rows,
            Parsed::Table(t) => t.to_rows(),
        }
    }
}

/// Dispatch source text to the parser for its kind.
pub(crate) fn parse_text(
    kind: SourceKind,
    text: &str,
    opts: &ParserOptions,
) -> Result<Parsed, MyError> {
    if let Some(parser) = registered(kind) {
        debug!("using registered parser for '{kind}'");
        return Ok(Parsed::Rows(parser(text, opts)?));
    }
    match kind {
        SourceKind::Csv => Ok(Parsed::Rows(csv::rows(text, opts)?)),
        SourceKind::Json
        | SourceKind::GeoJson
        | SourceKind::TopoJson
        | SourceKind::JsonDb => parse_value(kind, &serde_json::from_str(text)?, opts),
        SourceKind::Rss => Ok(Parsed::Rows(xml::rss_rows(text)?)),
        SourceKind::Kml => Ok(Parsed::Rows(xml::kml_rows(text)?)),
        SourceKind::Gml => Ok(Parsed::Rows(xml::gml_rows(text)?)),
        SourceKind::JsonStat => Err(MyError::Format(
            "no parser available for 'jsonstat'; register one".into(),
        )),
        SourceKind::Parquet | SourceKind::GeoParquet => Err(MyError::Format(
            "parquet sources are binary; load them through a feed".into(),
        )),
    }
}

/// Dispatch an in-memory JSON object to the parser for its kind.
pub(crate) fn parse_value(
    kind: SourceKind,
    value: &serde_json::Value,
    opts: &ParserOptions,
) -> Result<Parsed, MyError> {
    match kind {
        SourceKind::Json => Ok(Parsed::Rows(json::rows_from_value(value)?)),
        SourceKind::GeoJson => Ok(Parsed::Rows(geojson::rows_from_geojson(value)?)),
        SourceKind::TopoJson => Ok(Parsed::Rows(geojson::rows_from_topojson(
            value,
            opts.name.as_deref(),
        )?)),
        SourceKind::JsonDb => Ok(Parsed::Table(Table::from_jsondb(value)?)),
        x => Err(MyError::Format(
            format!("source kind '{x}' does not take an in-memory object").into(),
        )),
    }
}
