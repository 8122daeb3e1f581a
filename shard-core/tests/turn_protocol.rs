//! Protocol tests for the schema-validated turn loop.
//!
//! These drive a full session through a scripted backend and verify the
//! repair policy, history atomicity, and turn logging.

use shard_core::testing::{assert_committed, assert_failed, valid_turn_json, ScriptedLlm, TestHarness};
use shard_core::TurnOutcome;

#[tokio::test]
async fn first_attempt_success_commits_and_logs_once() {
    let mut harness = TestHarness::new(ScriptedLlm::new([valid_turn_json("Eli")]));

    let outcome = harness.turn("I ask about the shipment").await;
    let reply = assert_committed(&outcome);
    assert_eq!(reply.speaker, "Eli");

    let records = harness.logged_records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.valid);
    assert_eq!(record.attempts, 1);
    assert!(!record.recovered);
    assert_eq!(record.turn, 1);
    assert_eq!(record.user_input, "I ask about the shipment");
    assert_eq!(record.model, "scripted-llm");
    assert!(record.parsed_output.is_some());
    assert!(record.errors.is_empty());
    assert!(record.prompt.contains("Player input: I ask about the shipment"));
}

#[tokio::test]
async fn invalid_then_valid_recovers_after_retry() {
    let mut harness = TestHarness::new(ScriptedLlm::new([
        "I will answer in plain prose instead of JSON.".to_string(),
        valid_turn_json("Eli"),
    ]));

    let outcome = harness.turn("I press Eli harder").await;
    match &outcome {
        TurnOutcome::Story { recovered, .. } => assert!(recovered),
        other => panic!("expected recovered story turn, got {other:?}"),
    }

    let records = harness.logged_records();
    assert_eq!(records.len(), 1);
    assert!(records[0].valid);
    assert_eq!(records[0].attempts, 2);
    assert!(records[0].recovered);

    // The committed pair landed despite the bad first attempt.
    assert_eq!(harness.history_len(), 3);
}

#[tokio::test]
async fn invalid_twice_fails_session_without_touching_history() {
    let mut harness = TestHarness::new(ScriptedLlm::new([
        "not json",
        "{\"narrator\": \"still missing five keys\"}",
    ]));
    let before = harness.history_len();

    let outcome = harness.turn("I ask again").await;
    let errors = assert_failed(&outcome);
    assert!(errors.iter().any(|e| e.contains("Missing required key")));

    // Nothing appended: both or neither.
    assert_eq!(harness.history_len(), before);

    let records = harness.logged_records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].valid);
    assert_eq!(records[0].attempts, 2);
    assert!(!records[0].recovered);
    // Raw text from the most recent attempt is what gets logged.
    assert!(records[0].raw_output.contains("still missing five keys"));
}

#[tokio::test]
async fn backend_error_abandons_turn_and_session_continues() {
    let mut llm = ScriptedLlm::empty();
    llm.queue_error("connection refused");
    llm.queue(valid_turn_json("Eli"));
    let mut harness = TestHarness::new(llm);
    let before = harness.history_len();

    let outcome = harness.turn("I ask about the shard").await;
    match outcome {
        TurnOutcome::Abandoned { reason } => assert!(reason.contains("connection refused")),
        other => panic!("expected abandoned turn, got {other:?}"),
    }
    assert_eq!(harness.history_len(), before);

    // The next input runs a normal turn.
    let outcome = harness.turn("I try the question again").await;
    assert_committed(&outcome);
}

#[tokio::test]
async fn repair_keeps_invalid_output_out_of_the_conversation() {
    // Two consecutive turns, each recovering on the retry. If invalid
    // output leaked into history, the second turn's window would carry it.
    let mut harness = TestHarness::new(ScriptedLlm::new([
        "garbage one".to_string(),
        valid_turn_json("Eli"),
        "garbage two".to_string(),
        valid_turn_json("Eli"),
    ]));

    assert_committed(&harness.turn("first question").await);
    assert_committed(&harness.turn("second question").await);

    // Two committed pairs on top of the system seed.
    assert_eq!(harness.history_len(), 5);
    let records = harness.logged_records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.recovered));
}

#[tokio::test]
async fn memory_summary_tracks_latest_committed_turn() {
    let mut harness = TestHarness::new(ScriptedLlm::new([valid_turn_json("Eli")]));
    assert_committed(&harness.turn("I ask around").await);
    assert_eq!(
        harness.session.last_memory_summary(),
        "Eli agreed to talk."
    );
}
