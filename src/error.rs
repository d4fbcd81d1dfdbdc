// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Errors raised from this library.
//!

use peg::{error::ParseError, str::LineCol};
use std::borrow::Cow;
use thiserror::Error;

/// Variants of error raised from this library.
///
/// The first five variants mirror the load/operate failure taxonomy of the
/// engine: transport, format, engine, semantic and internal. The remaining
/// ones wrap errors raised by the crates doing the actual byte work.
#[derive(Debug, Error)]
pub enum MyError {
    /// Source bytes could not be acquired: unreachable location, failed
    /// binary retrieval, etc...
    #[error("Transport error: {0}")]
    Transport(Cow<'static, str>),

    /// The source bytes exist but cannot be understood: unknown source
    /// kind, no parser available, indeterminate CSV delimiter, etc...
    #[error("Format error: {0}")]
    Format(Cow<'static, str>),

    /// The embedded SQL engine failed: bootstrap timeout, query failure,
    /// or a result set over the hard row cap.
    #[error("Engine error: {0}")]
    Engine(Cow<'static, str>),

    /// A referenced column does not exist, schemas do not line up, or a
    /// WHERE clause is incomplete.
    #[error("Semantic error: {0}")]
    Semantic(Cow<'static, str>),

    /// Something this layer should have prevented; e.g. a worker that
    /// could not be created.
    #[error("Internal error: {0}")]
    Internal(Cow<'static, str>),

    /// Data serialization/deserialization + I/O errors.
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),

    /// A fixed-width numeric read did not line up w/ its input slice.
    #[error("Slice error: {0}")]
    Slice(#[from] std::array::TryFromSliceError),

    /// Date, time + timestamp (`jiff`) parsing error.
    #[error("Date-Time error: {0}")]
    Time(#[from] jiff::Error),

    /// Filter mini-language (`peg`) related error.
    #[error("PEG error: {0:?}")]
    Text(ParseError<LineCol>),

    /// JSON-encoding (`serde`) related error.
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader related error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML reader related error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Embedded columnar engine (`polars`) related error.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
