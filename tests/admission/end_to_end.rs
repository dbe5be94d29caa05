use crate::support::{HIGH, LOW, QueuedJudge, enabled_config, heartflow_with, message};
use heartflow::MessageOutcome;
use heartflow::heartflow::GateDecision;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn burst_is_merged_while_other_sender_is_declined() {
    let judge = QueuedJudge::new(&[HIGH, LOW, HIGH, HIGH]);
    let (hf, mut rx) = heartflow_with(enabled_config(), judge.clone());
    let quiet = hf.debounce().quiet_duration();

    let first = hf.on_group_message(message("g1", "alice", "movie tonight?")).await;
    assert!(matches!(first, MessageOutcome::Deferred { .. }));

    let bob = hf.on_group_message(message("g1", "bob", "lol")).await;
    assert!(matches!(bob, MessageOutcome::Declined { .. }));

    tokio::time::sleep(quiet / 2).await;
    hf.on_group_message(message("g1", "alice", "something funny")).await;
    tokio::time::sleep(quiet / 2).await;
    hf.on_group_message(message("g1", "alice", "or scary")).await;
    assert_eq!(hf.debounce().pending_count("g1", "alice"), 3);

    let unit = rx.recv().await.unwrap();
    assert_eq!(unit.sender_id, "alice");
    assert_eq!(unit.message_count, 3);
    assert_eq!(unit.text, "movie tonight?\nsomething funny\nor scary");
    assert_eq!(unit.carrier.text, "movie tonight?");
    assert!(unit.addressed);

    let state = hf.energy().get_state("g1");
    assert_eq!(state.total_replies, 1);
    assert_eq!(state.total_messages, 2);
    assert!(!hf.debounce().is_waiting("g1", "alice"));
    assert_eq!(judge.calls(), 4);

    tokio::time::sleep(quiet * 2).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn malformed_judge_output_is_retried() {
    let judge = QueuedJudge::new(&["sure, sounds fun!", "```json\n{\"relevance\": 9", HIGH]);
    let (hf, _rx) = heartflow_with(enabled_config(), judge.clone());

    let outcome = hf.on_group_message(message("g1", "alice", "who's around?")).await;

    assert!(matches!(outcome, MessageOutcome::Deferred { .. }));
    assert_eq!(judge.calls(), 3);
    hf.debounce().cancel_all();
}

#[tokio::test]
async fn exhausted_retries_decline_the_message() {
    let mut config = enabled_config();
    config.judge.max_retries = 1;
    let judge = QueuedJudge::new(&["nope", "still nope", HIGH]);
    let (hf, _rx) = heartflow_with(config, judge.clone());

    let outcome = hf.on_group_message(message("g1", "alice", "hello?")).await;

    match outcome {
        MessageOutcome::Declined { score, reason } => {
            assert!(score.abs() < f64::EPSILON);
            assert!(reason.unwrap().contains("2 attempt"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(judge.calls(), 2);
    assert_eq!(hf.energy().get_state("g1").total_messages, 1);
}

#[tokio::test]
async fn whitelist_blocks_before_judging() {
    let mut config = enabled_config();
    config.whitelist.enabled = true;
    config.whitelist.chats = vec!["g2".into()];
    let judge = QueuedJudge::new(&[HIGH]);
    let (hf, _rx) = heartflow_with(config, judge.clone());

    let outcome = hf.on_group_message(message("g1", "alice", "hi")).await;

    assert_eq!(outcome, MessageOutcome::Skipped(GateDecision::NotWhitelisted));
    assert_eq!(judge.calls(), 0);
    assert!(hf.energy().is_empty());
}

#[tokio::test(start_paused = true)]
async fn status_and_reset_after_a_reply() {
    let judge = QueuedJudge::new(&[HIGH]);
    let (hf, mut rx) = heartflow_with(enabled_config(), judge);

    hf.on_group_message(message("g1", "alice", "ping")).await;
    rx.recv().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = hf.status_report("g1");
    assert_eq!(report.total_replies, 1);
    assert!(report.energy < 1.0);
    assert!((report.reply_rate_percent - 100.0).abs() < 1e-9);

    assert!(hf.reset_chat("g1"));
    let report = hf.status_report("g1");
    assert_eq!(report.total_replies, 0);
    assert!((report.energy - 1.0).abs() < 1e-9);
}
