//! Unit tests for the claude output message classifier.
//!
//! Covers every variant of the message taxonomy, both legacy and current
//! result field names, both content nesting depths, multi-item ordering,
//! and silent rejection of malformed lines.

use claude_bridge::stream::classifier::{classify, AgentMessage, ChatRole};

#[test]
fn init_message_classifies_with_session_id() {
    let msgs = classify(r#"{"type":"system","subtype":"init","session_id":"abc123"}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::Init {
            session_id: "abc123".to_owned()
        }]
    );
}

#[test]
fn init_without_session_id_is_unrecognized() {
    let msgs = classify(r#"{"type":"system","subtype":"init"}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::Unrecognized {
            subtype: "init".to_owned()
        }]
    );
}

#[test]
fn result_under_subtype_classifies() {
    let msgs = classify(r#"{"type":"system","subtype":"result","result":"done","is_error":false}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::Result {
            text: "done".to_owned(),
            is_error: false,
            duration_ms: None,
            api_duration_ms: None,
        }]
    );
}

/// The result indicator also appears under the legacy `msg_type` field name;
/// both spellings must classify identically.
#[test]
fn result_under_legacy_msg_type_classifies() {
    let msgs = classify(r#"{"type":"system","msg_type":"result","result":"done"}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::Result {
            text: "done".to_owned(),
            is_error: false,
            duration_ms: None,
            api_duration_ms: None,
        }]
    );
}

#[test]
fn result_carries_duration_metrics_and_error_flag() {
    let msgs = classify(
        r#"{"type":"system","subtype":"result","result":"x","is_error":true,"duration_ms":1500,"duration_api_ms":900}"#,
    );
    assert_eq!(
        msgs,
        vec![AgentMessage::Result {
            text: "x".to_owned(),
            is_error: true,
            duration_ms: Some(1500),
            api_duration_ms: Some(900),
        }]
    );
}

#[test]
fn other_system_subtype_is_unrecognized() {
    let msgs = classify(r#"{"type":"system","subtype":"hook_started"}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::Unrecognized {
            subtype: "hook_started".to_owned()
        }]
    );
}

#[test]
fn assistant_text_classifies_as_text_delta() {
    let msgs = classify(r#"{"type":"assistant","content":[{"type":"text","text":"Hello"}]}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::TextDelta {
            role: ChatRole::Assistant,
            text: "Hello".to_owned()
        }]
    );
}

/// Content may be nested one level down under `message`; both depths must
/// be checked.
#[test]
fn nested_message_content_is_found() {
    let msgs =
        classify(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hi"}]}}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::TextDelta {
            role: ChatRole::Assistant,
            text: "Hi".to_owned()
        }]
    );
}

#[test]
fn user_text_carries_user_role() {
    let msgs = classify(r#"{"type":"user","content":[{"type":"text","text":"ack"}]}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::TextDelta {
            role: ChatRole::User,
            text: "ack".to_owned()
        }]
    );
}

#[test]
fn empty_text_items_are_skipped() {
    let msgs = classify(r#"{"type":"assistant","content":[{"type":"text","text":""}]}"#);
    assert!(msgs.is_empty(), "empty text must not produce a delta");
}

/// Multiple content items yield one classified message per item, preserving
/// wire order.
#[test]
fn multiple_content_items_classify_in_order() {
    let msgs = classify(
        r#"{"type":"assistant","content":[{"type":"text","text":"a"},{"type":"tool_use","id":"t1","name":"Bash","input":{"cmd":"ls"}},{"type":"text","text":"b"}]}"#,
    );
    assert_eq!(msgs.len(), 3);
    assert_eq!(
        msgs[0],
        AgentMessage::TextDelta {
            role: ChatRole::Assistant,
            text: "a".to_owned()
        }
    );
    assert!(
        matches!(&msgs[1], AgentMessage::ToolInvoked { id, name, .. } if id == "t1" && name == "Bash")
    );
    assert_eq!(
        msgs[2],
        AgentMessage::TextDelta {
            role: ChatRole::Assistant,
            text: "b".to_owned()
        }
    );
}

#[test]
fn tool_use_serializes_input_compactly() {
    let msgs = classify(
        r#"{"type":"assistant","content":[{"type":"tool_use","id":"t1","name":"Bash","input":{"cmd":"ls"}}]}"#,
    );
    assert_eq!(
        msgs,
        vec![AgentMessage::ToolInvoked {
            id: "t1".to_owned(),
            name: "Bash".to_owned(),
            input: r#"{"cmd":"ls"}"#.to_owned(),
        }]
    );
}

#[test]
fn tool_use_without_input_has_empty_input() {
    let msgs =
        classify(r#"{"type":"assistant","content":[{"type":"tool_use","id":"t2","name":"Read"}]}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::ToolInvoked {
            id: "t2".to_owned(),
            name: "Read".to_owned(),
            input: String::new(),
        }]
    );
}

#[test]
fn tool_result_with_string_content() {
    let msgs = classify(
        r#"{"type":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"file.txt"}]}"#,
    );
    assert_eq!(
        msgs,
        vec![AgentMessage::ToolCompleted {
            id: "t1".to_owned(),
            output: "file.txt".to_owned(),
        }]
    );
}

#[test]
fn tool_result_with_array_content_takes_first_text() {
    let msgs = classify(
        r#"{"type":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":[{"type":"text","text":"out"},{"type":"text","text":"ignored"}]}]}"#,
    );
    assert_eq!(
        msgs,
        vec![AgentMessage::ToolCompleted {
            id: "t1".to_owned(),
            output: "out".to_owned(),
        }]
    );
}

/// A tool result without textual payload still classifies, with an empty
/// output — a successful no-output result is distinct from no result at all.
#[test]
fn tool_result_without_text_has_empty_output() {
    let msgs =
        classify(r#"{"type":"user","content":[{"type":"tool_result","tool_use_id":"t1"}]}"#);
    assert_eq!(
        msgs,
        vec![AgentMessage::ToolCompleted {
            id: "t1".to_owned(),
            output: String::new(),
        }]
    );
}

#[test]
fn malformed_line_classifies_to_nothing() {
    assert!(classify("not-json{{{").is_empty());
    assert!(classify(r#"{"type":"system""#).is_empty());
}

#[test]
fn blank_line_classifies_to_nothing() {
    assert!(classify("").is_empty());
    assert!(classify("   ").is_empty());
}

#[test]
fn unknown_top_level_type_is_dropped() {
    assert!(classify(r#"{"type":"result","result":"x"}"#).is_empty());
    assert!(classify(r#"{"type":"telemetry"}"#).is_empty());
}

#[test]
fn classification_is_deterministic() {
    let line = r#"{"type":"assistant","content":[{"type":"text","text":"same"}]}"#;
    assert_eq!(classify(line), classify(line));
}
