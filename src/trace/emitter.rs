//! Trace emitter: classified messages → discrete spans.
//!
//! A secondary consumer of the same message stream the runner processes.
//! Maintains a single "last output" cursor seeded with the original request
//! text, so each generation span records what the model saw as input and
//! what it produced. Tool invocations defer their span until the result
//! arrives, then emit one combined span via the [`ToolCallTable`].

use std::sync::Arc;

use tracing::debug;

use crate::stream::classifier::{AgentMessage, ChatRole};
use crate::trace::tools::ToolCallTable;
use crate::trace::SpanSink;

/// Maximum attribute value length before truncation.
const MAX_ATTR_LENGTH: usize = 1000;

/// Truncate an attribute value, appending an ellipsis marker when cut.
fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ATTR_LENGTH {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(MAX_ATTR_LENGTH).collect();
    out.push_str("...");
    out
}

/// Identifiers shared by every span of one execution.
#[derive(Debug, Clone)]
pub struct TraceContext {
    /// Task the execution belongs to.
    pub task_id: String,
    /// Conversation context of the task.
    pub context_id: String,
    /// Message id of the originating request.
    pub message_id: String,
    /// Original request text; seeds the input cursor.
    pub user_text: String,
}

/// Replays classified messages as independent, non-nested spans.
pub struct TraceEmitter {
    sink: Arc<dyn SpanSink>,
    ctx: TraceContext,
    session_id: Option<String>,
    last_output: String,
    tools: ToolCallTable,
}

impl TraceEmitter {
    /// Create an emitter for one execution.
    #[must_use]
    pub fn new(sink: Arc<dyn SpanSink>, ctx: TraceContext) -> Self {
        let last_output = ctx.user_text.clone();
        Self {
            sink,
            ctx,
            session_id: None,
            last_output,
            tools: ToolCallTable::new(),
        }
    }

    /// Attributes common to every span of this execution.
    fn base_attributes(&self) -> Vec<(String, String)> {
        let mut attrs = vec![
            ("task.id".to_owned(), self.ctx.task_id.clone()),
            ("context.id".to_owned(), self.ctx.context_id.clone()),
            ("message.id".to_owned(), self.ctx.message_id.clone()),
        ];
        if let Some(ref session_id) = self.session_id {
            attrs.push(("session.id".to_owned(), session_id.clone()));
        }
        attrs
    }

    /// Process one classified message, emitting spans as described per
    /// variant in the module docs.
    pub fn on_message(&mut self, msg: &AgentMessage) {
        match msg {
            AgentMessage::Init { session_id } => self.on_init(session_id),
            AgentMessage::Result {
                text,
                is_error,
                duration_ms,
                api_duration_ms,
            } => self.on_result(text, *is_error, *duration_ms, *api_duration_ms),
            AgentMessage::TextDelta { role, text } => {
                // Only assistant output advances the generation trace.
                if *role == ChatRole::Assistant {
                    self.on_text(text);
                }
            }
            AgentMessage::ToolInvoked { id, name, input } => {
                // No span yet; the combined span is emitted on completion.
                if !id.is_empty() {
                    self.tools.record(id, name.clone(), input.clone());
                }
            }
            AgentMessage::ToolCompleted { id, output } => self.on_tool_completed(id, output),
            AgentMessage::Unrecognized { .. } => {}
        }
    }

    /// Zero-duration span recording the session handle and original request.
    fn on_init(&mut self, session_id: &str) {
        self.session_id = Some(session_id.to_owned());
        let mut attrs = self.base_attributes();
        attrs.push(("input.value".to_owned(), truncate(&self.ctx.user_text)));
        self.sink.start_span("claude.init", attrs).end();
    }

    /// Generation span for the final result, advancing the cursor when the
    /// result carries text.
    fn on_result(
        &mut self,
        text: &str,
        is_error: bool,
        duration_ms: Option<u64>,
        api_duration_ms: Option<u64>,
    ) {
        let mut attrs = self.base_attributes();
        attrs.push(("input.value".to_owned(), truncate(&self.last_output)));
        if !text.is_empty() {
            attrs.push(("output.value".to_owned(), truncate(text)));
        }
        if let Some(ms) = duration_ms {
            attrs.push(("llm.duration_ms".to_owned(), ms.to_string()));
        }
        if let Some(ms) = api_duration_ms {
            attrs.push(("llm.duration_api_ms".to_owned(), ms.to_string()));
        }
        attrs.push(("llm.is_error".to_owned(), is_error.to_string()));

        self.sink.start_span("claude.result", attrs).end();

        if !text.is_empty() {
            self.last_output = text.to_owned();
        }
    }

    /// Generation span for one assistant text delta; cursor advances to it.
    fn on_text(&mut self, text: &str) {
        let mut attrs = self.base_attributes();
        attrs.push(("input.value".to_owned(), truncate(&self.last_output)));
        attrs.push(("output.value".to_owned(), truncate(text)));
        self.sink.start_span("llm.claude", attrs).end();
        self.last_output = text.to_owned();
    }

    /// One combined span carrying the correlated input and resolved output.
    ///
    /// A miss in the correlation table (unknown or reused id) degrades to
    /// placeholder values rather than dropping the record.
    fn on_tool_completed(&mut self, id: &str, output: &str) {
        let (name, input) = match self.tools.resolve(id) {
            Some(pending) => (pending.name, pending.input),
            None => ("unknown".to_owned(), String::new()),
        };

        let mut attrs = self.base_attributes();
        attrs.push(("tool.name".to_owned(), name.clone()));
        attrs.push(("tool.input".to_owned(), truncate(&input)));
        attrs.push(("tool.output".to_owned(), truncate(output)));
        attrs.push(("input.value".to_owned(), truncate(&input)));
        attrs.push(("output.value".to_owned(), truncate(output)));
        if !id.is_empty() {
            attrs.push(("tool.id".to_owned(), id.to_owned()));
        }

        self.sink.start_span(&format!("tool.{name}"), attrs).end();
        self.last_output = output.to_owned();
    }
}

impl Drop for TraceEmitter {
    fn drop(&mut self) {
        if !self.tools.is_empty() {
            debug!(
                task_id = %self.ctx.task_id,
                pending = self.tools.len(),
                "discarding unresolved tool calls at trace teardown"
            );
        }
    }
}
