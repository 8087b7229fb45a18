use assert_cmd::Command;

#[test]
fn view_multibyte_rollout_does_not_panic() {
    let fixture = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/multibyte.jsonl"
    );

    Command::cargo_bin("transcripts")
        .unwrap()
        .args(["view", fixture])
        .assert()
        .success();
}

#[test]
fn info_multibyte_rollout_does_not_panic() {
    let fixture = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/multibyte.jsonl"
    );

    Command::cargo_bin("transcripts")
        .unwrap()
        .args(["info", fixture])
        .assert()
        .success();
}
