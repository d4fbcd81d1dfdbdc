// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Client-side tabular + geo-tabular data engine.
//!
//! The next paragraphs explain the elements of this project as well as the
//! rationale behind some of the decisions that shaped its components.
//!
//! # Tables
//!
//! The kernel of this project is the [`Table`]: an ordered field list over
//! a row-oriented record store where every record holds exactly one
//! [`Cell`] per field. Whatever the source --CSV text, a JSON tree, a KML
//! document, a Parquet blob-- ingestion normalizes it into this one shape,
//! and everything downstream (the operators, the merger, the mapping code
//! this library exists to feed) works against it.
//!
//! Cells keep a string-uniform at-rest contract: every cell can be read as
//! text, and numeric views are derived on demand w/ locale-tolerant
//! scanning ([`scan_number`]) b/c CSV values arrive w/ European decimal
//! commas more often than one would hope.
//!
//! ```rust
//! use geotable::prelude::*;
//!
//! let t = Table::from_rows(&[
//!     vec!["name".into(), "age".into()],
//!     vec!["Alice".into(), "30".into()],
//!     vec!["Bob".into(), "17".into()],
//!     vec!["Cleo".into(), "21".into()],
//! ]);
//! let adults = t.select(r#"WHERE "age" >= "18""#);
//! assert_eq!(adults.summary().records, 2);
//! ```
//!
//! # Operators
//!
//! Operators split along one public contract: the shaping ones --
//! [`Table::select`], [`Table::filter`], [`Table::pivot`],
//! [`Table::condense`], [`Table::subtable`], [`Table::aggregate`] and the
//! [`Merger`] -- return a fresh table; the mutating ones --
//! [`Table::add_row`], [`Table::add_column`], [`Table::sort`],
//! [`Table::revert`], [`Table::append`], the [`Column`] handle ops --
//! modify in place and return the receiver for chaining.
//!
//! Selection speaks a deliberately small `WHERE` mini-language: a flat
//! clause list, combiners w/o precedence, values quotable and
//! column-referencable (`$field$`). Misspelled columns and broken queries
//! warn and yield empty-but-typed results instead of raising; see
//! [`set_alert_sink`] for routing those warnings somewhere users look.
//!
//! # Ingestion
//!
//! A [`Feed`] wraps one source + kind and loads asynchronously through a
//! host-provided [`Transport`]; [`import`] is the synchronous convenience
//! for in-memory sources. The [`Broker`] realizes an ordered list of
//! feeds strictly sequentially and resolves once w/ one table per slot.
//!
//! Parquet and GeoParquet are the heavyweight path: blobs are registered
//! w/ an embedded columnar SQL engine (a process-wide singleton), probed
//! for geometry columns, and materialized w/ a strategy picked by row and
//! cell count --single-pass for small files, cooperative micro-batches or
//! a worker round-trip for large ones, w/ `(processed, total)` progress
//! events on the side. Geometry cells come out of the [`wkb`] codec as
//! GeoJSON strings, which is also where the Multi* family degrades to a
//! hex sentinel instead of an error.
//!

mod alert;
mod broker;
mod column;
mod condense;
mod config;
mod derive;
mod ds;
mod error;
mod feed;
mod lookup;
mod merge;
mod op;
mod pivot;
mod query;
mod select;
mod table;
mod value;
pub mod wkb;

pub use alert::{AlertSink, clear_alert_sink, set_alert_sink};
pub use broker::{Broker, NotifySink, broker};
pub use column::Column;
pub use condense::CondenseOpts;
pub use config::config;
pub use derive::TimeColumns;
pub use ds::{
    GEO_COLUMN_NAMES, PARQUET_MAGIC, ParserOptions, ProgressSender, ROW_CAP, RowParser,
    SourceKind, load_parquet, register_parser,
};
pub use error::MyError;
pub use feed::{Feed, FeedOptions, FileTransport, Source, Transport, feed, import, object};
pub use lookup::LookupCalc;
pub use merge::{MergeSource, Merger};
pub use pivot::{Calc, ColumnList, PivotOpts};
pub use table::{Field, FieldKind, Summary, Table};
pub use value::{Cell, fmt_num, parse_number, scan_number};

pub mod prelude;
