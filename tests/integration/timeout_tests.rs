//! Hard-deadline enforcement and failure-message resolution.

use claude_bridge::protocol::TaskState;

use super::test_helpers::{harness, request, RecordingSink};

/// A subprocess that outlives the deadline is killed and the task fails
/// with the generic timeout description when nothing better is available.
#[tokio::test]
async fn timeout_kills_the_subprocess_and_fails_the_task() {
    let harness = harness("sleep 30", 1);
    let sink = RecordingSink::new();

    harness
        .executor
        .execute(request("task-1", "ctx-1", "p"), &sink)
        .await;

    let final_update = sink.final_update().expect("terminal event published");
    assert_eq!(final_update.status.state, TaskState::Failed);
    let text = sink.final_text().expect("failure message");
    assert!(text.contains("exceeded 1s timeout"), "got: {text}");
    assert_eq!(harness.executor.running_count(), 0);
}

/// Captured stderr outranks the generic timeout description.
#[tokio::test]
async fn timeout_failure_prefers_stderr_text() {
    let stub = concat!("echo 'model backend unreachable' >&2\n", "sleep 30");
    let harness = harness(stub, 1);
    let sink = RecordingSink::new();

    harness
        .executor
        .execute(request("task-1", "ctx-1", "p"), &sink)
        .await;

    assert_eq!(
        sink.final_text().as_deref(),
        Some("model backend unreachable")
    );
}

/// Text streamed before the deadline is still delivered as `Working`
/// updates even though the task ultimately fails.
#[tokio::test]
async fn partial_output_before_timeout_is_published() {
    let stub = concat!(
        "printf '%s\\n' '{\"type\":\"assistant\",\"content\":[{\"type\":\"text\",\"text\":\"partial\"}]}'\n",
        "sleep 30",
    );
    let harness = harness(stub, 1);
    let sink = RecordingSink::new();

    harness
        .executor
        .execute(request("task-1", "ctx-1", "p"), &sink)
        .await;

    assert!(sink.working_texts().contains(&"partial".to_owned()));
    assert_eq!(
        sink.final_update().expect("terminal event").status.state,
        TaskState::Failed
    );
}
