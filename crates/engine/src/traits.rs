// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator contracts: the issue store and the agent client.
//!
//! Both are traits because this crate ships no concrete implementation of
//! either — the issue store is backed by whatever reads/writes
//! `issues/<id>.md`, and the agent client wraps whatever SDK talks to the
//! model provider. Tests drive the engine against the fakes in
//! [`crate::test_support`].

use async_trait::async_trait;
use barf_core::{Issue, IssueId, IssueState};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

/// Which phase an `IterationLoop` call is driving.
///
/// Distinct from [`barf_core::LockMode`]: a lock is held in `split` mode
/// too, but no caller ever *requests* split as the loop's starting mode —
/// `splitPending` derives it internally once an overflow is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Plan,
    Build,
}

/// The effective prompt template selector for one iteration, including
/// the internally-derived `split` case `Mode` itself never takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Plan,
    Build,
    Split,
}

impl From<Mode> for PromptMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Plan => PromptMode::Plan,
            Mode::Build => PromptMode::Build,
        }
    }
}

/// One message off the agent's event stream.
///
/// Only the fields the engine needs to drive `ContextBudget` and outcome
/// dispatch are modeled; everything else the provider sends is opaque to
/// this crate.
#[derive(Debug, Clone)]
pub enum AgentMessage {
    Assistant {
        input_tokens: u64,
        cache_creation_input_tokens: u64,
        cache_read_input_tokens: u64,
        /// Present when this turn belongs to a sub-agent rather than the
        /// main context; such turns are excluded from token accounting.
        parent_tool_use_id: Option<String>,
    },
    Tool {
        parent_tool_use_id: Option<String>,
    },
    Result {
        output_tokens: u64,
    },
    RateLimited {
        resets_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Error)]
pub enum AgentClientError {
    #[error("agent spawn failed: {0}")]
    SpawnFailed(String),
    #[error("agent stream error: {0}")]
    StreamError(String),
}

/// One model-provider round trip, from prompt submission to the stream's
/// terminal message.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Start a run. Messages arrive on `tx` until the stream closes.
    /// Returns once the agent process has been spawned; the caller reads
    /// completion off the channel, not off this future.
    async fn run(
        &self,
        prompt: &str,
        model: &str,
        tx: mpsc::Sender<AgentMessage>,
    ) -> Result<(), AgentClientError>;

    /// Request the running agent to stop. Must cause the stream passed to
    /// `run` to close with a terminal message within a bounded time.
    async fn interrupt(&self) -> Result<(), AgentClientError>;
}

#[derive(Debug, Error)]
pub enum IssueStoreError {
    #[error("issue not found: {0}")]
    NotFound(IssueId),
    #[error("no issue available to select")]
    NoneAvailable,
    #[error("issue store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fields an `IterationLoop` or `Verify` may update on an issue. All
/// optional; unset fields are left untouched by `write`.
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub force_split: Option<bool>,
    pub split_count: Option<u32>,
    pub context_usage_percent: Option<Option<u8>>,
    pub verify_count: Option<u32>,
    pub verify_exhausted: Option<bool>,
    pub children: Option<Vec<IssueId>>,
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn fetch(&self, id: &IssueId) -> Result<Issue, IssueStoreError>;
    async fn write(&self, id: &IssueId, patch: IssuePatch) -> Result<(), IssueStoreError>;
    async fn create_issue(
        &self,
        title: &str,
        body: Option<&str>,
        parent: Option<&IssueId>,
    ) -> Result<IssueId, IssueStoreError>;
    async fn delete_issue(&self, id: &IssueId) -> Result<(), IssueStoreError>;
    async fn list_issues(&self) -> Result<Vec<Issue>, IssueStoreError>;
    async fn transition(&self, id: &IssueId, to: IssueState) -> Result<(), barf_core::Error>;
    async fn check_acceptance_criteria(&self, id: &IssueId) -> Result<bool, IssueStoreError>;
    async fn auto_select(&self, mode: Mode) -> Result<IssueId, IssueStoreError>;

    /// Fold per-iteration usage into the issue's cumulative counters.
    /// Called from `IterationLoop`'s finally section; failures are
    /// logged by the caller, never propagated.
    async fn accumulate_stats(
        &self,
        id: &IssueId,
        input_tokens: u64,
        output_tokens: u64,
        duration_seconds: u64,
        iterations: u32,
    ) -> Result<(), IssueStoreError>;
}
