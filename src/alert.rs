// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! User-visible warning sink.
//!
//! Semantic slips --a misspelled column name, a schema mismatch on append--
//! are not errors: the engine keeps going and tells the user. Hosts that
//! have somewhere better than a log to put these messages (a status bar, an
//! alert box) inject a sink here; w/o one the message lands on `tracing`.
//!

use std::sync::{OnceLock, RwLock};
use tracing::warn;

/// Callback invoked w/ every user-visible warning message.
pub type AlertSink = Box<dyn Fn(&str) + Send + Sync>;

static SINK: OnceLock<RwLock<Option<AlertSink>>> = OnceLock::new();

fn sink() -> &'static RwLock<Option<AlertSink>> {
    SINK.get_or_init(|| RwLock::new(None))
}

/// Install a sink for user-visible warnings, replacing any previous one.
pub fn set_alert_sink(f: AlertSink) {
    if let Ok(mut guard) = sink().write() {
        *guard = Some(f);
    }
}

/// Remove the installed sink; warnings fall back to `tracing::warn!`.
pub fn clear_alert_sink() {
    if let Ok(mut guard) = sink().write() {
        *guard = None;
    }
}

/// Surface a user-visible warning.
pub(crate) fn alert(msg: &str) {
    warn!("{msg}");
    if let Ok(guard) = sink().read()
        && let Some(f) = guard.as_ref()
    {
        f(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn test_sink_receives_alerts() {
        // other tests alert concurrently; count only this test's marker.
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_ = hits.clone();
        set_alert_sink(Box::new(move |msg| {
            if msg.contains("sink-probe") {
                hits_.fetch_add(1, Ordering::SeqCst);
            }
        }));
        alert("sink-probe: column 'foo' not found");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        clear_alert_sink();
        alert("sink-probe: ignored");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
