//! Tool-call correlation.
//!
//! A `tool_use` message announces an invocation; the matching `tool_result`
//! arrives on a later line carrying only the invocation id. The table pairs
//! the two so the trace emitter can produce one combined span per tool call.
//!
//! The table is owned by a single execution and dropped with it, so entries
//! whose result never arrives are reclaimed at teardown rather than leaking
//! for the process lifetime.

use std::collections::HashMap;
use std::time::Instant;

/// An announced tool invocation awaiting its result.
#[derive(Debug, Clone)]
pub struct PendingToolCall {
    /// Tool name from the invocation message.
    pub name: String,
    /// Compact JSON rendering of the tool input.
    pub input: String,
    /// When the invocation was recorded.
    pub recorded_at: Instant,
}

/// Execution-scoped map of in-flight tool invocations, keyed by id.
#[derive(Debug, Default)]
pub struct ToolCallTable {
    inner: HashMap<String, PendingToolCall>,
}

impl ToolCallTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an announced invocation. A reused id overwrites the previous
    /// entry; the stale call can no longer correlate anyway.
    pub fn record(&mut self, id: &str, name: String, input: String) {
        self.inner.insert(
            id.to_owned(),
            PendingToolCall {
                name,
                input,
                recorded_at: Instant::now(),
            },
        );
    }

    /// Take the pending call for `id`, removing it from the table.
    ///
    /// `None` means the result arrived with an unknown (or already resolved)
    /// id; the consumer falls back to placeholder values.
    pub fn resolve(&mut self, id: &str) -> Option<PendingToolCall> {
        self.inner.remove(id)
    }

    /// Number of invocations still awaiting a result.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether every recorded invocation has been resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
