//! One-line console previews of classified messages.
//!
//! The runner logs every message it processes; these helpers compress a
//! message into a single short line so operator logs stay readable while a
//! task streams.

use crate::stream::classifier::AgentMessage;

/// Width previews are truncated to when the caller has no better number.
pub const DEFAULT_PREVIEW_WIDTH: usize = 80;

/// Shortest preview text we will produce before giving up on truncation.
const MIN_PREVIEW_CHARS: usize = 20;

/// Collapse all whitespace runs in `text` to single spaces.
fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate `text` so that `prefix_len + text` fits within `width`,
/// appending an ellipsis marker when anything was cut.
#[must_use]
pub fn truncate_to_fit(text: &str, prefix_len: usize, width: usize) -> String {
    let available = width.saturating_sub(prefix_len + 3).max(MIN_PREVIEW_CHARS);
    if text.chars().count() <= available {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(available).collect();
    out.push_str("...");
    out
}

/// Render a one-line preview of `msg`, truncated to `width` columns.
#[must_use]
pub fn preview(msg: &AgentMessage, width: usize) -> String {
    match msg {
        AgentMessage::Init { session_id } => {
            let short: String = session_id.chars().take(8).collect();
            format!("system:init session={short}...")
        }
        AgentMessage::Result { text, is_error, .. } => {
            let flat = collapse_ws(text);
            let prefix = "system:result ";
            let body = truncate_to_fit(&flat, prefix.len() + 2, width);
            if *is_error {
                format!("system:result error \"{body}\"")
            } else {
                format!("system:result \"{body}\"")
            }
        }
        AgentMessage::TextDelta { role, text } => {
            let flat = collapse_ws(text);
            let prefix = format!("{}: ", role.as_str());
            let body = truncate_to_fit(&flat, prefix.len() + 2, width);
            format!("{prefix}\"{body}\"")
        }
        AgentMessage::ToolInvoked { name, input, .. } => {
            let prefix = format!("assistant: {name} ");
            let body = truncate_to_fit(input, prefix.len(), width);
            format!("{prefix}{body}")
        }
        AgentMessage::ToolCompleted { output, .. } => {
            if output.is_empty() {
                "user: tool_result (ok)".to_owned()
            } else {
                let flat = collapse_ws(output);
                let prefix = "user: tool_result ";
                let body = truncate_to_fit(&flat, prefix.len() + 2, width);
                format!("{prefix}\"{body}\"")
            }
        }
        AgentMessage::Unrecognized { subtype } => format!("system:{subtype}"),
    }
}
