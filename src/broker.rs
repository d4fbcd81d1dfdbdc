// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Sequential multi-source loads w/ per-source result slots.
//!
//! The broker walks its slots strictly in order --slot N+1 starts only
//! after slot N completed-- and resolves exactly once w/ one table per
//! slot, substituting an empty table wherever a load failed. Failures are
//! surfaced through the notify sink (and the log), never by aborting the
//! run.
//!

use crate::{MyError, feed::Feed, table::Table};
use tracing::warn;

/// Callback invoked after every slot completes, w/ the slot index and its
/// result.
pub type NotifySink = Box<dyn Fn(usize, &Result<Table, MyError>) + Send + Sync>;

/// An ordered set of feeds realized in one sequential pass.
#[derive(Default)]
pub struct Broker {
    slots: Vec<Feed>,
    notify: Option<NotifySink>,
}

/// An empty [`Broker`].
pub fn broker() -> Broker {
    Broker::new()
}

impl Broker {
    /// An empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one feed slot.
    pub fn add(mut self, feed: Feed) -> Self {
        self.slots.push(feed);
        self
    }

    /// Install a per-slot completion sink.
    pub fn on_notify(mut self, sink: NotifySink) -> Self {
        self.notify = Some(sink);
        self
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// TRUE when no slot is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Load every slot in order and keep each slot's `Result`.
    pub async fn realize_results(self) -> Vec<Result<Table, MyError>> {
        let mut out = Vec::with_capacity(self.slots.len());
        for (i, feed) in self.slots.iter().enumerate() {
            let result = feed.load().await;
            if let Err(e) = &result {
                warn!("broker slot #{i} failed: {e}");
            }
            if let Some(sink) = &self.notify {
                sink(i, &result);
            }
            out.push(result);
        }
        out
    }

    /// Load every slot in order; a failed slot contributes an empty table
    /// so the output always has one entry per slot.
    pub async fn realize(self) -> Vec<Table> {
        self.realize_results()
            .await
            .into_iter()
            .map(|r| r.unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ds::SourceKind,
        feed::{FeedOptions, Source, feed},
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn csv_feed(text: &str) -> Feed {
        feed(FeedOptions::new(
            Source::Text(text.to_owned()),
            SourceKind::Csv,
        ))
    }

    #[tokio::test]
    async fn test_one_entry_per_slot_with_empty_substitute() {
        let b = broker()
            .add(csv_feed("a\n1\n"))
            .add(feed(FeedOptions::new(
                Source::Url("/no/such/file.csv".into()),
                SourceKind::Csv,
            )))
            .add(csv_feed("b\n2\n"));
        let tables = b.realize().await;
        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].summary().records, 1);
        assert_eq!(tables[1].summary(), Table::new().summary());
        assert_eq!(tables[2].column_names(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_notify_fires_in_slot_order() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_ = seen.clone();
        let b = broker()
            .add(csv_feed("a\n1\n"))
            .add(csv_feed("b\n2\n"))
            .on_notify(Box::new(move |i, result| {
                // strictly sequential: slot i completes i-th.
                assert_eq!(seen_.fetch_add(1, Ordering::SeqCst), i);
                assert!(result.is_ok());
            }));
        b.realize().await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
