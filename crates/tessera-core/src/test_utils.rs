//! Test helpers shared across tessera crates.
//!
//! [`record_logs`] routes this thread's tracing events into a [`LogRecord`]
//! so tests can assert on warnings and their fields. [`settle`] lets tasks
//! spawned on the current-thread test runtime reach their next suspension
//! point.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One event as the recorder saw it.
#[derive(Clone, Debug, Default)]
struct Logged {
    level: Option<Level>,
    message: String,
    fields: BTreeMap<&'static str, String>,
}

impl Visit for Logged {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

impl Logged {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            let _ = self.fields.insert(field.name(), value);
        }
    }
}

/// Events recorded since [`record_logs`] was called.
#[derive(Clone, Default)]
pub struct LogRecord(Arc<Mutex<Vec<Logged>>>);

impl LogRecord {
    /// Whether a `level` event mentioning `needle` was logged.
    pub fn logged(&self, level: Level, needle: &str) -> bool {
        self.0
            .lock()
            .iter()
            .any(|e| e.level == Some(level) && e.message.contains(needle))
    }

    /// Whether a warning mentioning `needle` was logged.
    pub fn warned(&self, needle: &str) -> bool {
        self.logged(Level::WARN, needle)
    }

    /// Field `name` of the latest event mentioning `needle`.
    pub fn field(&self, needle: &str, name: &str) -> Option<String> {
        self.0
            .lock()
            .iter()
            .rev()
            .find(|e| e.message.contains(needle))
            .and_then(|e| e.fields.get(name).cloned())
    }
}

impl<S: Subscriber> Layer<S> for LogRecord {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut logged = Logged {
            level: Some(*event.metadata().level()),
            ..Logged::default()
        };
        event.record(&mut logged);
        self.0.lock().push(logged);
    }
}

/// Record every event on the current thread until the guard drops.
pub fn record_logs() -> (LogRecord, DefaultGuard) {
    let record = LogRecord::default();
    let guard = tracing_subscriber::registry()
        .with(record.clone())
        .set_default();
    (record, guard)
}

/// Yield repeatedly so tasks woken by the last timer or channel event run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
