//! Session continuity: `--resume` must be passed iff the registry already
//! holds a handle for the task's context.

use claude_bridge::session::SessionStore;

use super::test_helpers::{harness, request, RecordingSink};

/// Stub that logs its argument vector into the workspace, then announces a
/// session handle.
const ARG_LOGGING_STUB: &str = concat!(
    "echo \"$@\" >> args.log\n",
    "printf '%s\\n' '{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"sess-one\"}'\n",
);

#[tokio::test]
async fn resume_follows_the_session_registry() {
    let harness = harness(ARG_LOGGING_STUB, 30);
    let args_log = harness.config.workspace_root.join("args.log");

    // First turn on ctx-1: no handle yet, so no --resume.
    let sink = RecordingSink::new();
    harness
        .executor
        .execute(request("task-1", "ctx-1", "first"), &sink)
        .await;

    // Second turn on ctx-1: the init above recorded sess-one.
    let sink = RecordingSink::new();
    harness
        .executor
        .execute(request("task-2", "ctx-1", "second"), &sink)
        .await;

    // A different context must not inherit ctx-1's session.
    let sink = RecordingSink::new();
    harness
        .executor
        .execute(request("task-3", "ctx-2", "third"), &sink)
        .await;

    let log = std::fs::read_to_string(&args_log).expect("stub must have logged args");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3, "one arg line per execution");

    assert!(
        !lines[0].contains("--resume"),
        "first turn must not resume: {}",
        lines[0]
    );
    assert!(
        lines[1].contains("--resume sess-one"),
        "second turn must resume the recorded session: {}",
        lines[1]
    );
    assert!(
        !lines[2].contains("--resume"),
        "a different context must not resume: {}",
        lines[2]
    );
}

/// A later init overwrites the stored handle for its context.
#[tokio::test]
async fn later_init_overwrites_the_handle() {
    let stub = concat!(
        "printf '%s\\n' '{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"sess-two\"}'\n",
    );
    let harness = harness(stub, 30);
    harness.sessions.set("ctx-1", "sess-old".to_owned());

    let sink = RecordingSink::new();
    harness
        .executor
        .execute(request("task-1", "ctx-1", "p"), &sink)
        .await;

    assert_eq!(harness.sessions.get("ctx-1"), Some("sess-two".to_owned()));
}
