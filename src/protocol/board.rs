//! In-memory task board.
//!
//! Holds the latest snapshot of every task published during the process
//! lifetime (task history does not survive a restart). The board is itself
//! an [`EventSink`], so the executor can publish straight into it; the HTTP
//! layer reads snapshots back out and, for streaming requests, tees events
//! into a per-request channel via [`ChannelSink`].

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::protocol::{EventSink, Task, TaskEvent};

/// Process-local store of task snapshots, keyed by task id.
#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the task with the given id.
    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
            .cloned()
    }

    /// Whether a record exists for the given task id.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(task_id)
    }

    /// Fold one event into the stored snapshots.
    fn apply(&self, event: TaskEvent) {
        let mut tasks = self.tasks.write().unwrap_or_else(PoisonError::into_inner);
        match event {
            TaskEvent::Task(task) => {
                tasks.insert(task.id.clone(), task);
            }
            TaskEvent::StatusUpdate(update) => {
                if let Some(task) = tasks.get_mut(&update.task_id) {
                    task.status = update.status;
                    // Only terminal replies join the history; intermediate
                    // updates carry cumulative text and would balloon it.
                    if update.is_final {
                        if let Some(message) = task.status.message.clone() {
                            task.history.push(message);
                        }
                    }
                } else {
                    debug!(
                        task_id = %update.task_id,
                        "status update for unknown task; creating record"
                    );
                    tasks.insert(
                        update.task_id.clone(),
                        Task {
                            id: update.task_id,
                            context_id: update.context_id,
                            status: update.status,
                            history: Vec::new(),
                        },
                    );
                }
            }
        }
    }
}

impl EventSink for TaskBoard {
    fn publish(&self, event: TaskEvent) {
        self.apply(event);
    }
}

/// Sink that updates the board and tees every event into a channel.
///
/// Used by the SSE endpoint: the receiving half of the channel drives the
/// event stream back to the caller while the board stays authoritative for
/// later snapshot reads. A closed receiver (client went away) only drops
/// the tee — board updates continue.
pub struct ChannelSink {
    board: Arc<TaskBoard>,
    tx: UnboundedSender<TaskEvent>,
}

impl ChannelSink {
    /// Create a sink teeing into `tx` on top of `board`.
    #[must_use]
    pub fn new(board: Arc<TaskBoard>, tx: UnboundedSender<TaskEvent>) -> Self {
        Self { board, tx }
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, event: TaskEvent) {
        self.board.publish(event.clone());
        if self.tx.send(event).is_err() {
            debug!("event subscriber dropped; board remains authoritative");
        }
    }
}
