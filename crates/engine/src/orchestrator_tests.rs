use barf_core::{Config, Issue, IssueState};
use tempfile::tempdir;

use crate::test_support::{FakeIssueStore, FixedPromptComposer, ScriptedAgentClient};
use crate::traits::{AgentMessage, Mode};

use super::*;

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.barf_dir = dir.join(".barf");
    config.plan_dir = dir.join("plans");
    config.issues_dir = dir.to_path_buf();
    config
}

fn success_script() -> Vec<AgentMessage> {
    vec![
        AgentMessage::Assistant {
            input_tokens: 10,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 0,
            parent_tool_use_id: None,
        },
        AgentMessage::Result { output_tokens: 5 },
    ]
}

#[tokio::test]
async fn no_candidate_returns_none_without_touching_the_agent() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let store = FakeIssueStore::new();
    let agent = ScriptedAgentClient::new(vec![]);
    let budget = ContextBudget::new();
    let prompts = FixedPromptComposer::default();

    let orchestrator = Orchestrator {
        issue_store: &store,
        agent_client: &agent,
        context_budget: &budget,
        prompts: &prompts,
        verifier: None,
        config: &config,
        pid: 1,
    };

    let outcome = orchestrator.run_once(Mode::Plan).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(agent.run_calls(), 0);
}

#[tokio::test]
async fn selects_new_issue_and_plans_it() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("plans")).unwrap();
    std::fs::write(dir.path().join("plans/001.md"), "plan body").unwrap();

    let config = test_config(dir.path());
    let store = FakeIssueStore::with_issue(Issue::new("001", "t", "b"));
    let agent = ScriptedAgentClient::new(vec![success_script()]);
    let budget = ContextBudget::new();
    let prompts = FixedPromptComposer::default();

    let orchestrator = Orchestrator {
        issue_store: &store,
        agent_client: &agent,
        context_budget: &budget,
        prompts: &prompts,
        verifier: None,
        config: &config,
        pid: 1,
    };

    let outcome = orchestrator.run_once(Mode::Plan).await.unwrap();
    assert_eq!(outcome, Some(LoopExit::Planned));
    assert_eq!(store.snapshot(&barf_core::IssueId::new("001")).unwrap().state(), IssueState::Planned);
}

#[tokio::test]
async fn draining_gate_blocks_plain_work() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let store = FakeIssueStore::with_issue(Issue::new("001", "t", "b"));
    let agent = ScriptedAgentClient::new(vec![success_script()]);
    let budget = ContextBudget::new();
    let prompts = FixedPromptComposer::default();

    std::fs::create_dir_all(&config.barf_dir).unwrap();
    let gate = barf_core::AuditGate {
        state: barf_core::AuditGateState::Draining,
        ..Default::default()
    };
    std::fs::write(config.audit_gate_path(), serde_json::to_vec(&gate).unwrap()).unwrap();

    let orchestrator = Orchestrator {
        issue_store: &store,
        agent_client: &agent,
        context_budget: &budget,
        prompts: &prompts,
        verifier: None,
        config: &config,
        pid: 1,
    };

    let outcome = orchestrator.run_once(Mode::Plan).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(agent.run_calls(), 0);
}

#[tokio::test]
async fn split_recurses_into_planning_new_children() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("plans")).unwrap();
    // The recursive plan pass for each child looks for its own plan file.
    std::fs::write(dir.path().join("plans/child-a.md"), "plan").unwrap();
    std::fs::write(dir.path().join("plans/child-b.md"), "plan").unwrap();

    let config = test_config(dir.path());
    let mut parent = Issue::new("001", "t", "b");
    parent.set_state_for_test(IssueState::Planned);
    let store = FakeIssueStore::with_issue(parent);
    store.insert(Issue::new("child-a", "a", ""));
    store.insert(Issue::new("child-b", "b", ""));

    // Overflow on the parent's build iteration, then a success turn for
    // the split itself, then one success turn per recursively-planned
    // child.
    let agent = ScriptedAgentClient::new(vec![
        vec![AgentMessage::Assistant {
            input_tokens: 500_000,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 0,
            parent_tool_use_id: None,
        }],
        success_script(),
        success_script(),
        success_script(),
    ]);
    let budget = ContextBudget::new();
    let prompts = FixedPromptComposer::default();

    store
        .write(
            &barf_core::IssueId::new("001"),
            crate::traits::IssuePatch {
                children: Some(vec![barf_core::IssueId::new("child-a"), barf_core::IssueId::new("child-b")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let orchestrator = Orchestrator {
        issue_store: &store,
        agent_client: &agent,
        context_budget: &budget,
        prompts: &prompts,
        verifier: None,
        config: &config,
        pid: 1,
    };

    let outcome = orchestrator.run_once(Mode::Build).await.unwrap();
    match outcome {
        Some(LoopExit::Split { children }) => {
            assert_eq!(children.len(), 2);
        }
        other => panic!("expected Some(Split), got {other:?}"),
    }

    assert_eq!(
        store.snapshot(&barf_core::IssueId::new("child-a")).unwrap().state(),
        IssueState::Planned
    );
    assert_eq!(
        store.snapshot(&barf_core::IssueId::new("child-b")).unwrap().state(),
        IssueState::Planned
    );
}
