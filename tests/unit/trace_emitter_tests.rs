//! Unit tests for the trace emitter.
//!
//! Drives the emitter with classified messages and asserts on the spans a
//! [`RecordingSpanSink`] captures.

use std::sync::Arc;

use claude_bridge::stream::classifier::{AgentMessage, ChatRole};
use claude_bridge::trace::emitter::{TraceContext, TraceEmitter};
use claude_bridge::trace::{RecordingSpanSink, SpanSink};

fn context() -> TraceContext {
    TraceContext {
        task_id: "task-1".to_owned(),
        context_id: "ctx-1".to_owned(),
        message_id: "msg-1".to_owned(),
        user_text: "original request".to_owned(),
    }
}

fn emitter() -> (Arc<RecordingSpanSink>, TraceEmitter) {
    let sink = Arc::new(RecordingSpanSink::new());
    let emitter = TraceEmitter::new(Arc::clone(&sink) as Arc<dyn SpanSink>, context());
    (sink, emitter)
}

#[test]
fn init_emits_span_with_session_and_request_input() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::Init {
        session_id: "sess-9".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "claude.init");
    assert_eq!(spans[0].attr("session.id"), Some("sess-9"));
    assert_eq!(spans[0].attr("input.value"), Some("original request"));
    assert_eq!(spans[0].attr("task.id"), Some("task-1"));
    assert_eq!(spans[0].attr("context.id"), Some("ctx-1"));
    assert_eq!(spans[0].attr("message.id"), Some("msg-1"));
}

/// Later spans carry the session id once init recorded it.
#[test]
fn session_id_propagates_to_later_spans() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::Init {
        session_id: "sess-9".to_owned(),
    });
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "hi".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans[1].attr("session.id"), Some("sess-9"));
}

/// The "last output" cursor seeds generation spans: the first delta sees the
/// request as input, the second sees the first delta.
#[test]
fn text_deltas_advance_the_cursor() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "first".to_owned(),
    });
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "second".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].name, "llm.claude");
    assert_eq!(spans[0].attr("input.value"), Some("original request"));
    assert_eq!(spans[0].attr("output.value"), Some("first"));
    assert_eq!(spans[1].attr("input.value"), Some("first"));
    assert_eq!(spans[1].attr("output.value"), Some("second"));
}

#[test]
fn user_text_deltas_emit_no_span() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::User,
        text: "tool echo".to_owned(),
    });
    assert!(sink.finished().is_empty());
}

#[test]
fn result_span_carries_durations_and_advances_cursor() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::Result {
        text: "final".to_owned(),
        is_error: false,
        duration_ms: Some(1200),
        api_duration_ms: Some(800),
    });
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "after".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans[0].name, "claude.result");
    assert_eq!(spans[0].attr("input.value"), Some("original request"));
    assert_eq!(spans[0].attr("output.value"), Some("final"));
    assert_eq!(spans[0].attr("llm.duration_ms"), Some("1200"));
    assert_eq!(spans[0].attr("llm.duration_api_ms"), Some("800"));
    assert_eq!(spans[0].attr("llm.is_error"), Some("false"));
    assert_eq!(spans[1].attr("input.value"), Some("final"));
}

#[test]
fn empty_result_keeps_the_cursor() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::Result {
        text: String::new(),
        is_error: false,
        duration_ms: None,
        api_duration_ms: None,
    });
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "x".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans[0].attr("output.value"), None);
    assert_eq!(spans[1].attr("input.value"), Some("original request"));
}

/// A tool invocation followed by its result emits exactly one combined span
/// named for the tool, carrying correlated input and resolved output.
#[test]
fn tool_sequence_emits_one_combined_span() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::ToolInvoked {
        id: "t1".to_owned(),
        name: "Bash".to_owned(),
        input: r#"{"cmd":"ls"}"#.to_owned(),
    });
    assert!(sink.finished().is_empty(), "no span until the result arrives");

    emitter.on_message(&AgentMessage::ToolCompleted {
        id: "t1".to_owned(),
        output: "file.txt".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans.len(), 1, "exactly one span per tool call");
    assert_eq!(spans[0].name, "tool.Bash");
    assert_eq!(spans[0].attr("tool.name"), Some("Bash"));
    assert_eq!(spans[0].attr("tool.input"), Some(r#"{"cmd":"ls"}"#));
    assert_eq!(spans[0].attr("tool.output"), Some("file.txt"));
    assert_eq!(spans[0].attr("tool.id"), Some("t1"));
}

#[test]
fn tool_output_advances_the_cursor() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::ToolInvoked {
        id: "t1".to_owned(),
        name: "Bash".to_owned(),
        input: String::new(),
    });
    emitter.on_message(&AgentMessage::ToolCompleted {
        id: "t1".to_owned(),
        output: "tool says".to_owned(),
    });
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: "next".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans[1].attr("input.value"), Some("tool says"));
}

/// An unmatched tool result still produces a usable span with placeholder
/// name and input.
#[test]
fn unmatched_tool_result_uses_placeholders() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::ToolCompleted {
        id: "ghost".to_owned(),
        output: "late".to_owned(),
    });

    let spans = sink.finished();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "tool.unknown");
    assert_eq!(spans[0].attr("tool.name"), Some("unknown"));
    assert_eq!(spans[0].attr("tool.input"), Some(""));
    assert_eq!(spans[0].attr("tool.output"), Some("late"));
}

#[test]
fn unrecognized_messages_emit_no_span() {
    let (sink, mut emitter) = emitter();
    emitter.on_message(&AgentMessage::Unrecognized {
        subtype: "hook_started".to_owned(),
    });
    assert!(sink.finished().is_empty());
}

/// Attribute values longer than the fixed maximum are truncated with an
/// ellipsis marker.
#[test]
fn long_attribute_values_are_truncated() {
    let (sink, mut emitter) = emitter();
    let long = "x".repeat(5000);
    emitter.on_message(&AgentMessage::TextDelta {
        role: ChatRole::Assistant,
        text: long,
    });

    let spans = sink.finished();
    let output = spans[0].attr("output.value").expect("output attr present");
    assert!(output.len() < 5000, "value must be truncated");
    assert!(output.ends_with("..."), "truncation must append an ellipsis");
}
