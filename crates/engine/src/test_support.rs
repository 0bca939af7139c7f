// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for exercising the engine without a real agent provider or
//! issue store. Used by this crate's own unit tests and exported for
//! downstream (CLI) tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use barf_core::{Issue, IssueId, IssueState};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::iteration_loop::PromptComposer;
use crate::traits::{
    AgentClient, AgentClientError, AgentMessage, IssueStore, IssueStoreError, IssuePatch, Mode,
};

/// An [`AgentClient`] that replays pre-scripted message sequences, one
/// per call to `run`, in the order they were registered.
#[derive(Default)]
pub struct ScriptedAgentClient {
    scripts: Mutex<VecDeque<Vec<AgentMessage>>>,
    run_calls: AtomicU32,
    interrupt_calls: AtomicU32,
}

impl ScriptedAgentClient {
    pub fn new(scripts: Vec<Vec<AgentMessage>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            run_calls: AtomicU32::new(0),
            interrupt_calls: AtomicU32::new(0),
        }
    }

    pub fn run_calls(&self) -> u32 {
        self.run_calls.load(Ordering::SeqCst)
    }

    pub fn interrupt_calls(&self) -> u32 {
        self.interrupt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentClient for ScriptedAgentClient {
    async fn run(
        &self,
        _prompt: &str,
        _model: &str,
        tx: mpsc::Sender<AgentMessage>,
    ) -> Result<(), AgentClientError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        tokio::spawn(async move {
            for message in script {
                if tx.send(message).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn interrupt(&self) -> Result<(), AgentClientError> {
        self.interrupt_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory [`IssueStore`]. `auto_select` returns the first issue whose
/// state matches what `mode` expects (`New` for plan, `Planned` for
/// build) in insertion order.
#[derive(Default)]
pub struct FakeIssueStore {
    issues: Mutex<HashMap<IssueId, Issue>>,
    order: Mutex<Vec<IssueId>>,
    acceptance_met: AtomicBool,
}

impl FakeIssueStore {
    pub fn new() -> Self {
        Self { acceptance_met: AtomicBool::new(true), ..Default::default() }
    }

    pub fn with_issue(issue: Issue) -> Self {
        let store = Self::new();
        store.insert(issue);
        store
    }

    pub fn insert(&self, issue: Issue) {
        let id = issue.id.clone();
        self.order.lock().push(id.clone());
        self.issues.lock().insert(id, issue);
    }

    pub fn set_acceptance_met(&self, met: bool) {
        self.acceptance_met.store(met, Ordering::SeqCst);
    }

    pub fn snapshot(&self, id: &IssueId) -> Option<Issue> {
        self.issues.lock().get(id).cloned()
    }
}

#[async_trait]
impl IssueStore for FakeIssueStore {
    async fn fetch(&self, id: &IssueId) -> Result<Issue, IssueStoreError> {
        self.issues.lock().get(id).cloned().ok_or_else(|| IssueStoreError::NotFound(id.clone()))
    }

    async fn write(&self, id: &IssueId, patch: IssuePatch) -> Result<(), IssueStoreError> {
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(id).ok_or_else(|| IssueStoreError::NotFound(id.clone()))?;
        if let Some(v) = patch.force_split {
            issue.force_split = v;
        }
        if let Some(v) = patch.split_count {
            issue.split_count = v;
        }
        if let Some(v) = patch.context_usage_percent {
            issue.context_usage_percent = v;
        }
        if let Some(v) = patch.verify_count {
            issue.verify_count = v;
        }
        if let Some(v) = patch.verify_exhausted {
            issue.verify_exhausted = v;
        }
        if let Some(v) = patch.children {
            issue.children = v;
        }
        Ok(())
    }

    async fn create_issue(
        &self,
        title: &str,
        body: Option<&str>,
        parent: Option<&IssueId>,
    ) -> Result<IssueId, IssueStoreError> {
        let id = IssueId::new(format!("issue-{}", self.order.lock().len() + 1));
        let mut issue = Issue::new(id.clone(), title, body.unwrap_or_default());
        issue.parent = parent.cloned();
        self.insert(issue);
        Ok(id)
    }

    async fn delete_issue(&self, id: &IssueId) -> Result<(), IssueStoreError> {
        self.issues.lock().remove(id);
        self.order.lock().retain(|existing| existing != id);
        Ok(())
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, IssueStoreError> {
        let issues = self.issues.lock();
        Ok(self.order.lock().iter().filter_map(|id| issues.get(id).cloned()).collect())
    }

    async fn transition(&self, id: &IssueId, to: IssueState) -> Result<(), barf_core::Error> {
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(id).expect("transition called on unknown issue in fake store");
        issue.transition(to)
    }

    async fn check_acceptance_criteria(&self, _id: &IssueId) -> Result<bool, IssueStoreError> {
        Ok(self.acceptance_met.load(Ordering::SeqCst))
    }

    async fn auto_select(&self, mode: Mode) -> Result<IssueId, IssueStoreError> {
        let want = match mode {
            Mode::Plan => IssueState::New,
            Mode::Build => IssueState::Planned,
        };
        let issues = self.issues.lock();
        self.order
            .lock()
            .iter()
            .find(|id| issues.get(*id).map(|i| i.state() == want).unwrap_or(false))
            .cloned()
            .ok_or(IssueStoreError::NoneAvailable)
    }

    async fn accumulate_stats(
        &self,
        id: &IssueId,
        input_tokens: u64,
        output_tokens: u64,
        duration_seconds: u64,
        iterations: u32,
    ) -> Result<(), IssueStoreError> {
        let mut issues = self.issues.lock();
        let issue = issues.get_mut(id).ok_or_else(|| IssueStoreError::NotFound(id.clone()))?;
        issue.accumulate_stats(input_tokens, output_tokens, duration_seconds, iterations);
        Ok(())
    }
}

/// A [`PromptComposer`] that ignores its inputs and returns a fixed
/// string, for tests that only care about dispatch behavior.
pub struct FixedPromptComposer(pub String);

impl Default for FixedPromptComposer {
    fn default() -> Self {
        Self("test prompt".to_string())
    }
}

impl PromptComposer for FixedPromptComposer {
    fn compose(&self, _mode: crate::traits::PromptMode, _issue: &Issue, _iteration: u32) -> String {
        self.0.clone()
    }
}
