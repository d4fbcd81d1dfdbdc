// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! The public entry points: feeds over URL-backed or in-memory sources.
//!
//! The source's nested success/error/callback triples collapse into plain
//! `Result`s here: [`Feed::load`] resolves exactly once w/ either the
//! table or the error, and batched Parquet loads report `(processed,
//! total)` pairs on an optional progress channel.
//!

use crate::{
    MyError,
    ds::{self, ParserOptions, ProgressSender, SourceKind, load_parquet},
    table::Table,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Capability of acquiring source bytes. HTTP stays outside this crate;
/// hosts hand in whatever transport they have.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a textual source.
    async fn fetch_text(&self, url: &str, cache: bool) -> Result<String, MyError>;

    /// Fetch a binary source.
    async fn fetch_blob(&self, url: &str, cache: bool) -> Result<Vec<u8>, MyError>;
}

/// The default [`Transport`]: the local filesystem.
#[derive(Debug, Default)]
pub struct FileTransport;

#[async_trait]
impl Transport for FileTransport {
    async fn fetch_text(&self, url: &str, _cache: bool) -> Result<String, MyError> {
        tokio::fs::read_to_string(url)
            .await
            .map_err(|e| MyError::Transport(format!("'{url}': {e}").into()))
    }

    async fn fetch_blob(&self, url: &str, _cache: bool) -> Result<Vec<u8>, MyError> {
        tokio::fs::read(url)
            .await
            .map_err(|e| MyError::Transport(format!("'{url}': {e}").into()))
    }
}

/// Where a feed's bytes come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A location the [`Transport`] understands.
    Url(String),
    /// Source text already in memory.
    Text(String),
    /// Binary source bytes already in memory.
    Blob(Vec<u8>),
    /// A parsed JSON object already in memory.
    Value(serde_json::Value),
}

/// Everything a [`Feed`] needs to know about its source.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// The source location or content.
    pub source: Source,
    /// Its kind.
    pub kind: SourceKind,
    /// Transport-level caching hint; defaults to TRUE.
    pub cache: bool,
    /// Parser steering (CSV delimiter, TopoJSON object name, ...).
    pub parser: ParserOptions,
}

impl FeedOptions {
    /// Options w/ the defaults every knob starts from.
    pub fn new(source: Source, kind: SourceKind) -> Self {
        Self {
            source,
            kind,
            cache: true,
            parser: ParserOptions::default(),
        }
    }
}

/// One loadable source.
pub struct Feed {
    opts: FeedOptions,
    transport: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    progress: Option<ProgressSender>,
}

/// A [`Feed`] over a (usually URL-backed) source.
pub fn feed(opts: FeedOptions) -> Feed {
    Feed {
        opts,
        transport: Arc::new(FileTransport),
        fallback: None,
        progress: None,
    }
}

/// A [`Feed`] over an in-memory JSON object.
pub fn object(value: serde_json::Value, kind: SourceKind) -> Feed {
    feed(FeedOptions::new(Source::Value(value), kind))
}

/// Synchronous convenience for in-memory sources whose parsers are
/// synchronous; Parquet kinds and URL-backed sources are refused.
pub fn import(opts: FeedOptions) -> Result<Table, MyError> {
    if opts.kind.is_binary() {
        return Err(MyError::Format(
            format!("source kind '{}' loads asynchronously", opts.kind).into(),
        ));
    }
    match &opts.source {
        Source::Text(text) => Ok(ds::parse_text(opts.kind, text, &opts.parser)?.into_table()),
        Source::Value(value) => Ok(ds::parse_value(opts.kind, value, &opts.parser)?.into_table()),
        Source::Blob(bytes) => Ok(ds::parse_text(
            opts.kind,
            &String::from_utf8_lossy(bytes),
            &opts.parser,
        )?
        .into_table()),
        Source::Url(_) => Err(MyError::Format(
            "URL-backed sources load asynchronously".into(),
        )),
    }
}

impl Feed {
    /// Replace the transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Install a fallback binary transport, retried when the primary
    /// fails to acquire a blob.
    pub fn with_fallback_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.fallback = Some(transport);
        self
    }

    /// Install a progress channel for the batched Parquet paths.
    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The source kind this feed loads.
    pub fn kind(&self) -> SourceKind {
        self.opts.kind
    }

    /// Load the source into a [`Table`]. Resolves exactly once: the table
    /// or the first error on the way to it.
    pub async fn load(&self) -> Result<Table, MyError> {
        Ok(self.parse().await?.into_table())
    }

    /// Load the source but stop at the raw 2-D cell array, bypassing
    /// table construction.
    pub async fn load_rows(&self) -> Result<Vec<Vec<String>>, MyError> {
        Ok(self.parse().await?.into_rows())
    }

    async fn parse(&self) -> Result<ds::Parsed, MyError> {
        let opts = &self.opts;
        if opts.kind.is_binary() {
            let (name, bytes) = match &opts.source {
                Source::Blob(b) => ("blob.parquet".to_owned(), b.clone()),
                Source::Url(u) => (u.clone(), self.fetch_blob_with_fallback(u).await?),
                _ => {
                    return Err(MyError::Format(
                        "parquet sources need a URL or a binary blob".into(),
                    ));
                }
            };
            let force_geo = opts.kind == SourceKind::GeoParquet;
            let table = load_parquet(&name, bytes, force_geo, self.progress.as_ref()).await?;
            return Ok(ds::Parsed::Table(table));
        }

        match &opts.source {
            Source::Value(value) => ds::parse_value(opts.kind, value, &opts.parser),
            Source::Text(text) => ds::parse_text(opts.kind, text, &opts.parser),
            Source::Blob(bytes) => {
                ds::parse_text(opts.kind, &String::from_utf8_lossy(bytes), &opts.parser)
            }
            Source::Url(u) => {
                debug!("loading '{u}' as {}", opts.kind);
                let text = self.transport.fetch_text(u, opts.cache).await?;
                ds::parse_text(opts.kind, &text, &opts.parser)
            }
        }
    }

    async fn fetch_blob_with_fallback(&self, url: &str) -> Result<Vec<u8>, MyError> {
        match self.transport.fetch_blob(url, self.opts.cache).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    warn!("primary transport failed ({e}); retrying via the fallback");
                    fallback.fetch_blob(url, self.opts.cache).await
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_csv_text() {
        let opts = FeedOptions::new(
            Source::Text("a,b\n1,2\n".to_owned()),
            SourceKind::Csv,
        );
        let t = import(opts).unwrap();
        assert_eq!(t.column_names(), vec!["a", "b"]);
        assert_eq!(t.summary().records, 1);
    }

    #[test]
    fn test_import_refuses_async_kinds() {
        let opts = FeedOptions::new(Source::Blob(vec![0u8]), SourceKind::Parquet);
        assert!(import(opts).is_err());
        let opts = FeedOptions::new(Source::Url("x.csv".into()), SourceKind::Csv);
        assert!(import(opts).is_err());
    }

    #[tokio::test]
    async fn test_object_feed_loads_json() {
        let t = object(json!([{"a": "1"}, {"a": "2"}]), SourceKind::Json)
            .load()
            .await
            .unwrap();
        assert_eq!(t.summary().records, 2);
    }

    #[tokio::test]
    async fn test_load_rows_bypasses_table() {
        let rows = object(json!([{"a": "1"}]), SourceKind::Json)
            .load_rows()
            .await
            .unwrap();
        assert_eq!(rows, vec![vec!["a".to_string()], vec!["1".to_string()]]);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_transport_error() {
        let f = feed(FeedOptions::new(
            Source::Url("/definitely/not/here.csv".into()),
            SourceKind::Csv,
        ));
        assert!(matches!(f.load().await, Err(MyError::Transport(_))));
    }
}
