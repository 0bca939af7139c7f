// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Selects the next issue to work on, enforces audit-gate admission, and
//! drives it through an [`IterationLoop`]. Recursion into planning a
//! split's children lives here, not in the loop itself, so the loop's
//! own return value stays a plain signal rather than a call stack.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use barf_core::{AuditGate, Config, Error, Issue, IssueId, IssueState};
use tokio_util::sync::CancellationToken;

use crate::audit_gate_store::AuditGateStore;
use crate::context_budget::ContextBudget;
use crate::iteration_loop::{IterationLoop, LoopExit, PromptComposer};
use crate::lock::Lock;
use crate::session_index::SessionIndex;
use crate::traits::{AgentClient, IssueStore, IssueStoreError, Mode};
use crate::verify::Verifier;

pub struct Orchestrator<'a> {
    pub issue_store: &'a dyn IssueStore,
    pub agent_client: &'a dyn AgentClient,
    pub context_budget: &'a ContextBudget,
    pub prompts: &'a dyn PromptComposer,
    pub verifier: Option<&'a dyn Verifier>,
    pub config: &'a Config,
    pub pid: u32,
}

impl<'a> Orchestrator<'a> {
    async fn load_gate(&self) -> AuditGate {
        AuditGateStore::new(self.config.audit_gate_path()).load()
    }

    async fn parent_map(&self) -> Result<HashMap<IssueId, IssueId>, IssueStoreError> {
        let issues = self.issue_store.list_issues().await?;
        Ok(issues
            .into_iter()
            .filter_map(|issue| issue.parent.clone().map(|parent| (issue.id, parent)))
            .collect())
    }

    /// Pick the next issue for `mode`, respecting the audit gate, and
    /// drive it to a terminal point. `Ok(None)` means there was nothing
    /// eligible to run right now (caller should back off and retry
    /// later); it is not an error.
    pub async fn run_once(&self, mode: Mode) -> Result<Option<LoopExit>, Error> {
        let candidate = match self.issue_store.auto_select(mode).await {
            Ok(id) => id,
            Err(IssueStoreError::NoneAvailable) => return Ok(None),
            Err(err) => return Err(Error::Store(Box::new(err))),
        };

        let gate = self.load_gate().await;
        let parent_of = self.parent_map().await.map_err(|err| Error::Store(Box::new(err)))?;
        let issue = self.issue_store.fetch(&candidate).await.map_err(|err| Error::Store(Box::new(err)))?;
        if !gate.admits(&issue, &parent_of) {
            return Ok(None);
        }

        let exit = self.drive(&candidate, mode, &issue).await?;
        Ok(Some(exit))
    }

    /// Drive a specific, already-selected issue through `mode`, recursing
    /// into planning any children a split produces.
    pub async fn drive(&self, id: &IssueId, mode: Mode, issue: &Issue) -> Result<LoopExit, Error> {
        let lock_mode = match mode {
            Mode::Plan => barf_core::LockMode::Plan,
            Mode::Build => barf_core::LockMode::Build,
        };
        let lock = Lock::new(&self.config.barf_dir);
        lock.acquire(id, lock_mode, issue.state(), self.pid, &barf_core::SystemClock)
            .map_err(Error::ProviderIo)?;

        let session_index = SessionIndex::new(self.config.sessions_index_path());
        let loop_ = IterationLoop {
            issue_store: self.issue_store,
            agent_client: self.agent_client,
            context_budget: self.context_budget,
            lock: &lock,
            session_index: &session_index,
            prompts: self.prompts,
            verifier: self.verifier,
            config: self.config,
            pid: self.pid,
        };

        let exit = loop_.run(id, mode, CancellationToken::new()).await?;

        if let LoopExit::Split { ref children } = exit {
            self.plan_new_children(children).await?;
        }

        Ok(exit)
    }

    /// For every child left in `New` state, recurse into planning it.
    /// Boxed because this calls back into `drive`, which calls this.
    fn plan_new_children<'b>(
        &'b self,
        children: &'b [IssueId],
    ) -> Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'b>> {
        Box::pin(async move {
            for child_id in children {
                let child = match self.issue_store.fetch(child_id).await {
                    Ok(issue) => issue,
                    Err(err) => {
                        tracing::warn!(issue = %child_id, error = %err, "could not fetch split child, skipping plan recursion");
                        continue;
                    }
                };
                if child.state() != IssueState::New {
                    continue;
                }
                if let Err(err) = self.drive(child_id, Mode::Plan, &child).await {
                    tracing::warn!(issue = %child_id, error = %err, "planning split child failed");
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
