//! Claude output message classifier.
//!
//! Each stdout line from the claude CLI is one JSON object. [`classify`]
//! normalizes a line into zero or more [`AgentMessage`] values so that
//! downstream consumers (the execution runner and the trace emitter) never
//! re-inspect the wire shape.
//!
//! # Wire format notes
//!
//! - The result indicator on `system` messages appears under either
//!   `subtype` (current) or `msg_type` (legacy); both are recognized here
//!   and nowhere else.
//! - Chat messages carry their content list either at the top level
//!   (`content`) or nested one level down (`message.content`); both are
//!   checked.
//! - Non-JSON lines and unknown top-level types classify to nothing — the
//!   caller skips them silently.

use serde::Deserialize;
use serde_json::Value;

// ── Wire shapes ───────────────────────────────────────────────────────────────

/// Top-level claude stream message as found on the wire.
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    msg_type: Option<String>,
    content: Option<Vec<WireContent>>,
    message: Option<WireEnvelope>,
    result: Option<String>,
    session_id: Option<String>,
    is_error: Option<bool>,
    duration_ms: Option<u64>,
    duration_api_ms: Option<u64>,
}

/// Nested `message` envelope some chat lines wrap their content in.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    content: Option<Vec<WireContent>>,
}

/// One item of a chat message content list.
#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    name: Option<String>,
    id: Option<String>,
    input: Option<Value>,
    content: Option<Value>,
    tool_use_id: Option<String>,
}

// ── Classified messages ───────────────────────────────────────────────────────

/// Originating role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Emitted by the model.
    Assistant,
    /// Emitted on behalf of the caller (tool results arrive this way).
    User,
}

impl ChatRole {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }
}

/// Normalized representation of one claude stream message.
///
/// A single raw line yields zero or more of these: chat messages produce one
/// value per content item, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMessage {
    /// Session bootstrap; carries the resumable session handle.
    Init {
        /// Opaque session token issued by the subprocess.
        session_id: String,
    },
    /// Final generation result for the run.
    Result {
        /// Result text; may be empty.
        text: String,
        /// Whether the subprocess flagged the result as an error.
        is_error: bool,
        /// Total wall-clock duration reported by the subprocess.
        duration_ms: Option<u64>,
        /// API-side duration reported by the subprocess.
        api_duration_ms: Option<u64>,
    },
    /// One incremental text fragment of the running answer.
    TextDelta {
        /// Role the fragment was emitted under.
        role: ChatRole,
        /// Non-empty fragment text.
        text: String,
    },
    /// A tool invocation was issued; pairs with a later [`AgentMessage::ToolCompleted`].
    ToolInvoked {
        /// Invocation id used for correlation; may be empty on the wire.
        id: String,
        /// Tool name.
        name: String,
        /// Compact JSON rendering of the tool input.
        input: String,
    },
    /// A tool invocation finished.
    ToolCompleted {
        /// Invocation id this result answers.
        id: String,
        /// Textual output; empty string means a successful no-output result.
        output: String,
    },
    /// `system` message with a recognized discriminant but unknown sub-shape.
    Unrecognized {
        /// The unrecognized subtype, for logging.
        subtype: String,
    },
}

/// Classify one raw output line.
///
/// Returns an empty vector for non-JSON lines, blank lines, and unknown
/// top-level types; never fails. Chat messages yield one entry per content
/// item, preserving wire order.
#[must_use]
pub fn classify(line: &str) -> Vec<AgentMessage> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    let Ok(msg) = serde_json::from_str::<WireMessage>(line) else {
        return Vec::new();
    };

    match msg.kind.as_str() {
        "system" => classify_system(msg),
        "assistant" => classify_chat(msg, ChatRole::Assistant),
        "user" => classify_chat(msg, ChatRole::User),
        _ => Vec::new(),
    }
}

/// Classify a `system` message into `Init`, `Result`, or `Unrecognized`.
fn classify_system(msg: WireMessage) -> Vec<AgentMessage> {
    let subtype = msg.subtype.as_deref().unwrap_or_default();
    let legacy = msg.msg_type.as_deref().unwrap_or_default();

    if subtype == "init" {
        if let Some(session_id) = msg.session_id {
            return vec![AgentMessage::Init { session_id }];
        }
    } else if subtype == "result" || legacy == "result" {
        return vec![AgentMessage::Result {
            text: msg.result.unwrap_or_default(),
            is_error: msg.is_error.unwrap_or(false),
            duration_ms: msg.duration_ms,
            api_duration_ms: msg.duration_api_ms,
        }];
    }

    let label = if subtype.is_empty() { legacy } else { subtype };
    vec![AgentMessage::Unrecognized {
        subtype: label.to_owned(),
    }]
}

/// Classify an `assistant`/`user` message: one entry per content item.
fn classify_chat(msg: WireMessage, role: ChatRole) -> Vec<AgentMessage> {
    // Content lives at the top level or nested under `message`.
    let items = msg
        .content
        .or_else(|| msg.message.and_then(|m| m.content))
        .unwrap_or_default();

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.kind.as_str() {
            "text" => {
                if let Some(text) = item.text.filter(|t| !t.is_empty()) {
                    out.push(AgentMessage::TextDelta { role, text });
                }
            }
            "tool_use" => {
                let input = item
                    .input
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                out.push(AgentMessage::ToolInvoked {
                    id: item.id.unwrap_or_default(),
                    name: item.name.unwrap_or_else(|| "unknown".to_owned()),
                    input,
                });
            }
            "tool_result" => {
                out.push(AgentMessage::ToolCompleted {
                    id: item.tool_use_id.unwrap_or_default(),
                    output: tool_result_text(item.content.as_ref()),
                });
            }
            _ => {}
        }
    }
    out
}

/// Extract the textual payload of a `tool_result` content field.
///
/// The wire carries either a plain string or an array whose first element
/// holds a `text` field. Anything else yields the empty string, which is
/// meaningful downstream: a successful no-output result.
fn tool_result_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .first()
            .and_then(|v| v.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        _ => String::new(),
    }
}
