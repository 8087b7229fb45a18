use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use transcript_format::{group_conversation, ContentBlock, LogType};
use transcript_rollout::{
    parse_rollout_file, parse_rollout_file_with, parse_rollout_str, MirrorPolicy, RolloutError,
};
use uuid::Uuid;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn system_label(block: &ContentBlock) -> &str {
    match block {
        ContentBlock::SystemRecord { label, .. } => label,
        other => panic!("Expected SystemRecord, got {:?}", other),
    }
}

#[test]
fn sample_session_normalizes_and_dedups() {
    let parsed = parse_rollout_file(&fixture("sample.jsonl")).unwrap();
    let loglines = &parsed.session.loglines;

    assert_eq!(parsed.stats.total_lines, 18);
    assert_eq!(parsed.stats.parsed_rollout_lines, 18);
    assert_eq!(parsed.stats.skipped_lines, 0);
    assert_eq!(parsed.stats.emitted_loglines, 14);
    assert_eq!(loglines.len(), 14);
    assert!(!parsed.stats.has_drift());

    // Only the event_msg mirrors of the turns survive.
    let user_prompts: Vec<_> = loglines.iter().filter_map(|l| l.prompt_text()).collect();
    assert_eq!(user_prompts, vec!["Add a README and commit it", "Thanks"]);
    let assistant_texts = loglines
        .iter()
        .filter(|l| l.kind == LogType::Assistant)
        .flat_map(|l| l.content_blocks())
        .filter(|b| matches!(b, ContentBlock::Text { .. }))
        .count();
    assert_eq!(assistant_texts, 1);

    for logline in loglines {
        assert_eq!(logline.kind, logline.message.role);
        assert!(logline.has_content());
    }
}

#[test]
fn sample_session_meta() {
    let parsed = parse_rollout_file(&fixture("sample.jsonl")).unwrap();
    let meta = parsed.meta.expect("session meta");
    assert_eq!(meta.id.as_deref(), Some("0199a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b"));
    assert_eq!(meta.cwd.as_deref(), Some("/home/dev/proj"));
    assert_eq!(meta.cli_version.as_deref(), Some("0.46.0"));
    assert_eq!(meta.branch(), Some("main"));
    assert_eq!(meta.github_repo().as_deref(), Some("acme/widgets"));
}

#[test]
fn sample_session_tool_blocks() {
    let parsed = parse_rollout_file(&fixture("sample.jsonl")).unwrap();
    let blocks: Vec<&ContentBlock> = parsed
        .session
        .loglines
        .iter()
        .flat_map(|l| l.content_blocks())
        .collect();

    assert!(blocks.contains(&&ContentBlock::tool_use(
        "shell",
        json!({"command": ["bash", "-lc", "ls"]}),
        "call_1"
    )));
    assert!(blocks.contains(&&ContentBlock::tool_result(
        json!("src\nCargo.toml\n"),
        false,
        "call_1"
    )));
    // apply_patch input is not JSON and is wrapped under its field name.
    assert!(blocks.iter().any(|b| matches!(
        b,
        ContentBlock::ToolUse { name, input, id }
            if name == "apply_patch" && id == "call_2" && input["input"].as_str().unwrap().starts_with("*** Begin Patch")
    )));
    assert!(blocks.iter().any(|b| matches!(
        b,
        ContentBlock::ToolUse { name, id, .. } if name == "turn_context" && id.is_empty()
    )));
    assert!(blocks.contains(&&ContentBlock::text("**Turn aborted** (interrupted)")));
}

#[test]
fn sample_session_groups() {
    let parsed = parse_rollout_file(&fixture("sample.jsonl")).unwrap();
    let groups = group_conversation(&parsed.session.loglines);

    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].prompt, None);
    assert_eq!((groups[0].start, groups[0].end), (0, 0));

    let task = &groups[1];
    assert_eq!(task.prompt.as_deref(), Some("Add a README and commit it"));
    assert_eq!((task.start, task.end), (1, 11));
    assert_eq!(task.duration_ms, Some(9_000));
    assert_eq!(
        task.tool_counts,
        BTreeMap::from([
            ("apply_patch".to_string(), 1),
            ("shell".to_string(), 2),
            ("token_count".to_string(), 1),
        ])
    );
    assert_eq!(task.commit_count(), 1);
    assert_eq!(task.commits[0].hash, "1a2b3c4d");
    assert_eq!(task.commits[0].subject, "Add README");

    assert_eq!(groups[2].prompt.as_deref(), Some("Thanks"));
    assert_eq!(groups[2].duration_ms, Some(1_000));
}

#[test]
fn drift_is_counted_and_rendered() {
    let parsed = parse_rollout_file(&fixture("drift.jsonl")).unwrap();
    let stats = &parsed.stats;

    assert_eq!(stats.total_lines, 8);
    assert_eq!(stats.skipped_lines, 3);
    assert_eq!(stats.parsed_rollout_lines, 5);
    assert_eq!(stats.emitted_loglines, 5);
    assert_eq!(
        stats.system_event_types,
        BTreeMap::from([("mystery_event".to_string(), 2)])
    );
    assert_eq!(
        stats.system_rollout_types,
        BTreeMap::from([("totally_new_type".to_string(), 1)])
    );
    assert_eq!(
        stats.system_response_item_types,
        BTreeMap::from([("ghost_snapshot".to_string(), 1)])
    );
    assert_eq!(stats.system_total(), 4);

    let labels: Vec<&str> = parsed
        .session
        .loglines
        .iter()
        .filter(|l| l.kind == LogType::System)
        .map(|l| system_label(&l.content_blocks()[0]))
        .collect();
    assert_eq!(
        labels,
        vec![
            "event_msg:mystery_event",
            "rollout:totally_new_type",
            "response_item:ghost_snapshot",
            "event_msg:mystery_event",
        ]
    );
}

#[test]
fn unrecognized_record_is_preserved_verbatim() {
    let line = r#"{"timestamp":"T","type":"totally_new_type","payload":{"nested":{"a":[1,2]}},"extra":"kept"}"#;
    let parsed = parse_rollout_str(line).unwrap();
    match &parsed.session.loglines[0].content_blocks()[0] {
        ContentBlock::SystemRecord { label, record } => {
            assert_eq!(label, "rollout:totally_new_type");
            assert_eq!(record, &serde_json::from_str::<serde_json::Value>(line).unwrap());
        }
        other => panic!("Expected SystemRecord, got {:?}", other),
    }
    assert_eq!(parsed.stats.system_rollout_types.get("totally_new_type"), Some(&1));
}

#[test]
fn single_user_message() {
    let parsed = parse_rollout_str(
        r#"{"timestamp":"T","type":"event_msg","payload":{"type":"user_message","message":"Hello"}}"#,
    )
    .unwrap();
    assert_eq!(parsed.session.loglines.len(), 1);
    assert_eq!(parsed.session.loglines[0].kind, LogType::User);
    assert_eq!(parsed.session.loglines[0].plain_text(), Some("Hello"));
    assert!(parsed.meta.is_none());
}

#[test]
fn function_call_arguments() {
    let parsed = parse_rollout_str(
        r#"{"timestamp":"T","type":"response_item","payload":{"type":"function_call","name":"read","arguments":"{\"path\":\"a.txt\"}","call_id":"c"}}"#,
    )
    .unwrap();
    assert_eq!(
        parsed.session.loglines[0].content_blocks(),
        &[ContentBlock::tool_use("read", json!({"path": "a.txt"}), "c")]
    );
    assert_eq!(parsed.session.loglines[0].kind, LogType::Assistant);
}

#[test]
fn response_items_are_the_only_source_without_event_mirrors() {
    let parsed = parse_rollout_file(&fixture("response_only.jsonl")).unwrap();
    let loglines = &parsed.session.loglines;

    assert_eq!(parsed.stats.emitted_loglines, 6);
    assert_eq!(loglines[0].plain_text(), Some("List files"));
    assert_eq!(
        loglines[1].content_blocks(),
        &[ContentBlock::tool_use("shell", json!({"arguments": "not json"}), "c1")]
    );
    assert_eq!(
        loglines[2].content_blocks(),
        &[ContentBlock::tool_result(
            json!({"success": false, "output": "bad args"}),
            true,
            "c1"
        )]
    );
    assert_eq!(loglines[3].content_blocks(), &[ContentBlock::text("The call failed.")]);
    assert_eq!(
        loglines[4].content_blocks(),
        &[ContentBlock::thinking("Summary of earlier work")]
    );
    assert_eq!(
        loglines[5].content_blocks(),
        &[ContentBlock::text("**Context compacted**")]
    );
}

#[test]
fn keep_all_policy_keeps_both_mirrors() {
    let parsed = parse_rollout_file_with(&fixture("sample.jsonl"), MirrorPolicy::KeepAll).unwrap();
    assert_eq!(parsed.stats.emitted_loglines, 17);
}

#[test]
fn no_usable_messages() {
    let result = parse_rollout_file(&fixture("garbage.jsonl"));
    assert!(matches!(result, Err(RolloutError::NoUsableMessages)));
    assert_eq!(
        result.unwrap_err().to_string(),
        "no usable messages found in rollout file"
    );
}

#[test]
fn json_array_encoding() {
    let parsed = parse_rollout_file(&fixture("array.json")).unwrap();
    assert_eq!(parsed.stats.total_lines, 3);
    assert_eq!(parsed.stats.skipped_lines, 1);
    assert_eq!(parsed.session.loglines.len(), 2);
}

#[test]
fn normalized_json_document_has_no_records() {
    let dir = std::env::temp_dir().join(format!("transcript-rollout-test-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("already.json");
    fs::write(&path, r#"{"loglines": [{"type": "user"}]}"#).unwrap();

    let result = parse_rollout_file(&path);
    assert!(matches!(result, Err(RolloutError::NoUsableMessages)));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_file_is_io_error() {
    let result = parse_rollout_file(&fixture("does-not-exist.jsonl"));
    assert!(matches!(result, Err(RolloutError::Io { .. })));
}

#[test]
fn parsing_is_idempotent() {
    let first = parse_rollout_file(&fixture("drift.jsonl")).unwrap();
    let second = parse_rollout_file(&fixture("drift.jsonl")).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.session).unwrap(),
        serde_json::to_string(&second.session).unwrap()
    );
}
