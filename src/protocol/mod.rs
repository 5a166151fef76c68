//! Task protocol surface.
//!
//! Models the external request/response protocol: work is a "task" with an
//! externally observable lifecycle (`submitted → working → completed|failed`)
//! and a stream of status-update events. The execution core is write-only
//! against this surface — it publishes events through [`EventSink`] and
//! never reads prior events back.

pub mod board;
pub mod card;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Task accepted, execution not yet started.
    Submitted,
    /// Execution in flight; republished per incremental update.
    Working,
    /// Terminal: execution finished successfully.
    Completed,
    /// Terminal: execution failed, timed out, or was canceled.
    Failed,
}

impl TaskState {
    /// Whether this state ends the task lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Originator of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller.
    User,
    /// This server, speaking for the subprocess.
    Agent,
}

/// One content part of a protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    /// Plain text content.
    Text {
        /// The text payload.
        text: String,
    },
}

/// A message exchanged over the task protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessage {
    /// Who authored the message.
    pub role: Role,
    /// Unique message identifier.
    pub message_id: String,
    /// Ordered content parts.
    pub parts: Vec<Part>,
    /// Task the message belongs to.
    pub task_id: String,
    /// Conversation context of the task.
    pub context_id: String,
}

impl ProtocolMessage {
    /// Build an agent-authored text message with a fresh message id.
    #[must_use]
    pub fn agent_text(task_id: &str, context_id: &str, text: String) -> Self {
        Self {
            role: Role::Agent,
            message_id: Uuid::new_v4().to_string(),
            parts: vec![Part::Text { text }],
            task_id: task_id.to_owned(),
            context_id: context_id.to_owned(),
        }
    }

    /// Build the user-authored request message that seeds a task's history.
    #[must_use]
    pub fn user_text(task_id: &str, context_id: &str, message_id: String, text: String) -> Self {
        Self {
            role: Role::User,
            message_id,
            parts: vec![Part::Text { text }],
            task_id: task_id.to_owned(),
            context_id: context_id.to_owned(),
        }
    }

    /// Concatenated text of all text parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|Part::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Status snapshot attached to a task or a status-update event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// Lifecycle state.
    pub state: TaskState,
    /// Optional agent message accompanying the state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ProtocolMessage>,
    /// RFC 3339 timestamp of the transition.
    pub timestamp: String,
}

impl TaskStatus {
    /// Build a status stamped with the current time.
    #[must_use]
    pub fn now(state: TaskState, message: Option<ProtocolMessage>) -> Self {
        Self {
            state,
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// A task record as exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Conversation context the task belongs to.
    pub context_id: String,
    /// Current status snapshot.
    pub status: TaskStatus,
    /// Message history: the originating request plus terminal agent replies.
    pub history: Vec<ProtocolMessage>,
}

/// Incremental status-update event for an existing task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
    /// Task the update applies to.
    pub task_id: String,
    /// Conversation context of the task.
    pub context_id: String,
    /// New status snapshot.
    pub status: TaskStatus,
    /// Marks the last event that will ever be published for this task.
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// One event on the append-only task event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskEvent {
    /// A new task record was created.
    Task(Task),
    /// A task changed status.
    StatusUpdate(TaskStatusUpdate),
}

impl TaskEvent {
    /// Whether this event closes its task's event stream.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::StatusUpdate(update) if update.is_final)
    }
}

/// Append-only sink for task events.
///
/// The execution core publishes at-least-once, in processing order, and
/// never reads back. Implementations must not block the caller.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn publish(&self, event: TaskEvent);
}
