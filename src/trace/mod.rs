//! Trace span emission for task executions.
//!
//! The [`SpanSink`] trait is the seam to the observability backend: the core
//! only ever starts a span with a fixed attribute set and immediately ends
//! it. Spans are never nested and never mutated after creation, so the sink
//! contract reduces to delivering one finished [`SpanRecord`] per span.
//!
//! Two implementations ship with the binary: [`TracingSpanSink`] forwards
//! spans through the `tracing` subscriber that also carries the server's
//! structured logs, and [`RecordingSpanSink`] captures spans in memory for
//! assertions in tests.

pub mod emitter;
pub mod tools;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

/// One finished, non-nested span: a name plus flat string attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name, e.g. `claude.init` or `tool.Bash`.
    pub name: String,
    /// Attribute key/value pairs, already truncated by the emitter.
    pub attributes: Vec<(String, String)>,
}

impl SpanRecord {
    /// Look up an attribute value by key.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Destination for finished spans.
pub trait SpanSink: Send + Sync {
    /// Start a span with the given name and attributes.
    ///
    /// The returned [`Span`] delivers the record to the sink when ended (or
    /// dropped); the record cannot be modified after this call.
    fn start_span(&self, name: &str, attributes: Vec<(String, String)>) -> Span;
}

/// An in-flight span handle; ending it delivers the record to its sink.
///
/// Dropping an unended span still delivers it — span loss would undercount
/// work, and at-least-once is the delivery target.
pub struct Span {
    record: Option<SpanRecord>,
    deliver: Arc<dyn Fn(SpanRecord) + Send + Sync>,
}

impl Span {
    /// Create a span bound to a delivery function.
    fn new(record: SpanRecord, deliver: Arc<dyn Fn(SpanRecord) + Send + Sync>) -> Self {
        Self {
            record: Some(record),
            deliver,
        }
    }

    /// End the span, delivering its record to the sink.
    pub fn end(mut self) {
        if let Some(record) = self.record.take() {
            (self.deliver)(record);
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            (self.deliver)(record);
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span").field("record", &self.record).finish()
    }
}

/// [`SpanSink`] that emits each span as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSpanSink;

impl SpanSink for TracingSpanSink {
    fn start_span(&self, name: &str, attributes: Vec<(String, String)>) -> Span {
        let record = SpanRecord {
            name: name.to_owned(),
            attributes,
        };
        Span::new(
            record,
            Arc::new(|record: SpanRecord| {
                let attrs = record
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                info!(span = %record.name, %attrs, "trace span");
            }),
        )
    }
}

/// [`SpanSink`] that stores every finished span in memory.
#[derive(Debug, Default)]
pub struct RecordingSpanSink {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordingSpanSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all spans delivered so far, in delivery order.
    #[must_use]
    pub fn finished(&self) -> Vec<SpanRecord> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SpanSink for RecordingSpanSink {
    fn start_span(&self, name: &str, attributes: Vec<(String, String)>) -> Span {
        let record = SpanRecord {
            name: name.to_owned(),
            attributes,
        };
        let spans = Arc::clone(&self.spans);
        Span::new(
            record,
            Arc::new(move |record: SpanRecord| {
                spans
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(record);
            }),
        )
    }
}
