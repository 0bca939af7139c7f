use proptest::prelude::*;
use tokio::sync::mpsc;

use super::*;
use crate::test_support::ScriptedAgentClient;

#[test]
fn threshold_is_floor_of_percent_of_limit() {
    let mut budget = ContextBudget::new();
    budget.register("claude-sonnet-4-6", 100_000);
    assert_eq!(budget.threshold("claude-sonnet-4-6", 75), 75_000);
    assert_eq!(budget.threshold("claude-sonnet-4-6", 1), 1_000);
    assert_eq!(budget.threshold("claude-sonnet-4-6", 0), 0);
    assert_eq!(budget.threshold("claude-sonnet-4-6", 100), 100_000);
}

#[test]
fn unregistered_model_falls_back_to_default_limit() {
    let budget = ContextBudget::new();
    assert_eq!(budget.limit("unknown-model"), 200_000);
}

proptest! {
    #[test]
    fn threshold_matches_formula(limit in 1u64..1_000_000, percent in 0u8..=100) {
        let mut budget = ContextBudget::new();
        budget.register("m", limit);
        prop_assert_eq!(budget.threshold("m", percent), limit * percent as u64 / 100);
    }
}

#[tokio::test]
async fn success_outcome_when_stream_closes_normally() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentMessage::Assistant {
        input_tokens: 10,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: 0,
        parent_tool_use_id: None,
    })
    .await
    .unwrap();
    tx.send(AgentMessage::Result { output_tokens: 42 }).await.unwrap();
    drop(tx);

    let client = ScriptedAgentClient::default();
    let outcome =
        consume(&client, rx, 1_000, CancellationToken::new(), StreamSinks::default()).await;
    assert_eq!(outcome.kind(), StreamOutcomeKind::Success);
    assert_eq!(outcome.context_size(), 10);
    assert_eq!(outcome.output_tokens(), 42);
}

#[tokio::test]
async fn overflow_triggers_interrupt_and_drains_remaining_messages() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentMessage::Assistant {
        input_tokens: 900,
        cache_creation_input_tokens: 50,
        cache_read_input_tokens: 60,
        parent_tool_use_id: None,
    })
    .await
    .unwrap();
    tx.send(AgentMessage::Result { output_tokens: 1 }).await.unwrap();
    drop(tx);

    let client = ScriptedAgentClient::default();
    let outcome = consume(&client, rx, 1_000, CancellationToken::new(), StreamSinks::default()).await;
    assert_eq!(outcome.kind(), StreamOutcomeKind::Overflow);
    assert_eq!(outcome.context_size(), 1010);
    assert_eq!(client.interrupt_calls(), 1);
}

#[tokio::test]
async fn sub_agent_turns_are_excluded_from_accounting() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentMessage::Assistant {
        input_tokens: 999_999,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: 0,
        parent_tool_use_id: Some("tool-1".to_string()),
    })
    .await
    .unwrap();
    tx.send(AgentMessage::Assistant {
        input_tokens: 5,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: 0,
        parent_tool_use_id: None,
    })
    .await
    .unwrap();
    tx.send(AgentMessage::Result { output_tokens: 5 }).await.unwrap();
    drop(tx);

    let client = ScriptedAgentClient::default();
    let outcome = consume(&client, rx, 1_000, CancellationToken::new(), StreamSinks::default()).await;
    assert_eq!(outcome.kind(), StreamOutcomeKind::Success);
    assert_eq!(outcome.context_size(), 5);
}

#[tokio::test]
async fn rate_limited_message_short_circuits_the_stream() {
    let (tx, rx) = mpsc::channel(8);
    tx.send(AgentMessage::RateLimited { resets_at: None }).await.unwrap();
    drop(tx);

    let client = ScriptedAgentClient::default();
    let outcome = consume(&client, rx, 1_000, CancellationToken::new(), StreamSinks::default()).await;
    assert_eq!(outcome.kind(), StreamOutcomeKind::RateLimited);
    assert_eq!(outcome.context_size(), 0);
}

#[tokio::test]
async fn cancellation_interrupts_and_reports_error() {
    let (_tx, rx) = mpsc::channel::<AgentMessage>(8);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = ScriptedAgentClient::default();
    let outcome = consume(&client, rx, 1_000, cancel, StreamSinks::default()).await;
    assert_eq!(outcome.kind(), StreamOutcomeKind::Error);
    assert_eq!(client.interrupt_calls(), 1);
}
