// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The loop that drives one issue through plan or build iterations to a
//! terminal point.

use std::time::Duration;

use barf_core::{AuditTrigger, Config, Error, Issue, IssueId, IssueState, SessionId, SessionIndexEvent, SessionStats};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context_budget::{ContextBudget, StreamOutcomeKind, StreamSinks};
use crate::lock::Lock;
use crate::overflow_policy::{self, OverflowDecision};
use crate::pre_complete_gate;
use crate::session_index::SessionIndex;
use crate::traits::{AgentClient, IssuePatch, IssueStore, Mode, PromptMode};
use crate::verify::{Verifier, VerifyOutcome};

/// Composes the prompt text for one iteration. Reading template files
/// off disk (`promptDir`) and substituting variables is an
/// implementation detail of whatever composer is wired in; the loop
/// only needs the resulting string.
pub trait PromptComposer: Send + Sync {
    fn compose(&self, mode: PromptMode, issue: &Issue, iteration: u32) -> String;
}

/// How one `run` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// Plan iteration ran; a plan file existed afterward and the issue
    /// transitioned to `Planned`.
    Planned,
    /// Plan iteration ran but no plan file existed afterward; issue left
    /// in its prior state.
    PlanNotProduced,
    /// Build iteration completed, acceptance criteria held, and the
    /// pre-complete gate passed; issue transitioned to `Completed` and
    /// Verify ran.
    BuildCompleted,
    /// A split iteration produced children; the lock has already been
    /// released. The caller (`Orchestrator`) is responsible for
    /// recursing into planning each child.
    Split { children: Vec<IssueId> },
    /// A split iteration produced no children; loop broke without a
    /// further transition.
    SplitWithNoChildren,
    /// `maxIterations` reached without completing.
    IterationsExhausted,
    /// The agent reported a non-success result; loop broke cleanly.
    AgentErrorBroke,
    /// Issue was already `Completed` or `Verified` when (re-)read.
    AlreadyTerminal,
}

pub struct IterationLoop<'a> {
    pub issue_store: &'a dyn IssueStore,
    pub agent_client: &'a dyn AgentClient,
    pub context_budget: &'a ContextBudget,
    pub lock: &'a Lock<'a>,
    pub session_index: &'a SessionIndex,
    pub prompts: &'a dyn PromptComposer,
    pub verifier: Option<&'a dyn Verifier>,
    pub config: &'a Config,
    pub pid: u32,
}

impl<'a> IterationLoop<'a> {
    fn model_for(&self, mode: Mode) -> String {
        match mode {
            Mode::Plan => self.config.plan_model.clone(),
            Mode::Build => self.config.build_model.clone(),
        }
    }

    /// Drive `id` through `mode` to a terminal point. Precondition: the
    /// caller already holds the lock for `id`.
    pub async fn run(
        &self,
        id: &IssueId,
        mode: Mode,
        cancel: CancellationToken,
    ) -> Result<LoopExit, Error> {
        let session_id = SessionId::new();
        let session_start = Utc::now();

        let mut split_pending = false;
        let mut model = self.model_for(mode);
        let mut iteration: u32 = 0;
        let mut iterations_ran: u32 = 0;
        let mut total_input_tokens: u64 = 0;
        let mut total_output_tokens: u64 = 0;
        let mut last_context_size: u64 = 0;

        self.session_index.append(&SessionIndexEvent::Start {
            session_id: session_id.clone(),
            issue_id: id.clone(),
            pid: self.pid,
            at: session_start,
            stream_byte_offset: 0,
        });

        let result = self.run_inner(
            id,
            mode,
            &cancel,
            &mut split_pending,
            &mut model,
            &mut iteration,
            &mut iterations_ran,
            &mut total_input_tokens,
            &mut total_output_tokens,
            &mut last_context_size,
        )
        .await;

        // Finally: persist stats, release the lock. Both best-effort.
        let duration_seconds = (Utc::now() - session_start).num_seconds().max(0) as u64;
        if iterations_ran > 0 {
            self.persist_stats(id, total_input_tokens, total_output_tokens, duration_seconds, iterations_ran).await;
        }

        if let Err(err) = self.lock.release(id) {
            tracing::warn!(issue = %id, error = %err, "lock release failed");
        }

        self.session_index.append(&SessionIndexEvent::End {
            session_id,
            issue_id: id.clone(),
            pid: self.pid,
            at: Utc::now(),
            stream_byte_offset: 0,
            stats: SessionStats {
                started_at: session_start,
                duration_seconds,
                input_tokens: total_input_tokens,
                output_tokens: total_output_tokens,
                final_context_size: last_context_size,
                iterations: iterations_ran,
                model,
            },
        });

        result
    }

    async fn persist_stats(&self, id: &IssueId, input: u64, output: u64, duration_seconds: u64, iterations: u32) {
        if let Err(err) = self.issue_store.accumulate_stats(id, input, output, duration_seconds, iterations).await {
            tracing::warn!(issue = %id, error = %err, "failed to persist iteration stats");
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_inner(
        &self,
        id: &IssueId,
        mode: Mode,
        cancel: &CancellationToken,
        split_pending: &mut bool,
        model: &mut String,
        iteration: &mut u32,
        iterations_ran: &mut u32,
        total_input_tokens: &mut u64,
        total_output_tokens: &mut u64,
        last_context_size: &mut u64,
    ) -> Result<LoopExit, Error> {
        // Step 1: initial transition.
        if mode == Mode::Build {
            let issue = self.issue_store.fetch(id).await.map_err(store_err)?;
            if issue.state() == IssueState::Planned {
                if let Err(err) = self.issue_store.transition(id, IssueState::InProgress).await {
                    tracing::warn!(issue = %id, error = %err, "initial transition to in_progress failed");
                }
            }
        }

        // Step 2: force_split short-circuit.
        if mode == Mode::Build {
            let issue = self.issue_store.fetch(id).await.map_err(store_err)?;
            if issue.force_split {
                let decision = overflow_policy::decide(
                    issue.split_count,
                    self.config.max_auto_splits,
                    &self.config.split_model,
                    &self.config.extended_context_model,
                );
                match decision {
                    OverflowDecision::Split { next_model } => {
                        *split_pending = true;
                        *model = next_model;
                    }
                    OverflowDecision::Escalate { next_model } => {
                        *model = next_model;
                    }
                }
                let _ = self
                    .issue_store
                    .write(
                        id,
                        IssuePatch {
                            split_count: Some(issue.split_count + 1),
                            force_split: Some(false),
                            ..Default::default()
                        },
                    )
                    .await;
            }
        }

        // Step 3: iteration loop.
        loop {
            if self.config.max_iterations != 0 && *iteration >= self.config.max_iterations {
                return Ok(LoopExit::IterationsExhausted);
            }

            let issue = self.issue_store.fetch(id).await.map_err(store_err)?;
            if matches!(issue.state(), IssueState::Completed | IssueState::Verified) {
                return Ok(LoopExit::AlreadyTerminal);
            }

            let current_mode = if *split_pending { PromptMode::Split } else { mode.into() };
            let prompt = self.prompts.compose(current_mode, &issue, *iteration);
            let percent = issue.context_usage_percent.unwrap_or(self.config.context_usage_percent);
            let threshold = self.context_budget.threshold(model, percent);

            let (tx, rx) = mpsc::channel(64);
            *iterations_ran += 1;
            self.agent_client
                .run(&prompt, model, tx)
                .await
                .map_err(|e| Error::AgentError { message: e.to_string() })?;

            let consume_fut =
                crate::context_budget::consume(self.agent_client, rx, threshold, cancel.clone(), StreamSinks::default());
            let outcome = if self.config.claude_timeout_secs > 0 {
                match tokio::time::timeout(Duration::from_secs(self.config.claude_timeout_secs), consume_fut).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let _ = self.agent_client.interrupt().await;
                        crate::context_budget::StreamOutcome::Error { context_size: 0, output_tokens: 0 }
                    }
                }
            } else {
                consume_fut.await
            };

            *total_input_tokens += outcome.context_size();
            *total_output_tokens += outcome.output_tokens();
            *last_context_size = outcome.context_size();

            emit_stats_marker(*total_input_tokens, *total_output_tokens, *last_context_size, *iteration);

            if cancel.is_cancelled() {
                return Ok(LoopExit::AgentErrorBroke);
            }

            match outcome.kind() {
                StreamOutcomeKind::RateLimited => {
                    let resets_at = match &outcome {
                        crate::context_budget::StreamOutcome::RateLimited { resets_at, .. } => *resets_at,
                        _ => None,
                    };
                    return Err(Error::RateLimit { resets_at });
                }
                StreamOutcomeKind::Error => {
                    return Ok(LoopExit::AgentErrorBroke);
                }
                StreamOutcomeKind::Overflow => {
                    let decision = overflow_policy::decide(
                        issue.split_count,
                        self.config.max_auto_splits,
                        &self.config.split_model,
                        &self.config.extended_context_model,
                    );
                    match decision {
                        OverflowDecision::Split { next_model } => {
                            *split_pending = true;
                            *model = next_model;
                            let _ = self
                                .issue_store
                                .write(id, IssuePatch { split_count: Some(issue.split_count + 1), ..Default::default() })
                                .await;
                        }
                        OverflowDecision::Escalate { next_model } => {
                            *model = next_model;
                        }
                    }
                    *iteration += 1;
                    continue;
                }
                StreamOutcomeKind::Success => {
                    if *split_pending {
                        *split_pending = false;
                        if issue.state() != IssueState::Split {
                            if let Err(err) = self.issue_store.transition(id, IssueState::Split).await {
                                tracing::warn!(issue = %id, error = %err, "split transition failed");
                            }
                        }
                        let refreshed = self.issue_store.fetch(id).await.map_err(store_err)?;
                        if refreshed.children.is_empty() {
                            return Ok(LoopExit::SplitWithNoChildren);
                        }
                        // Stats persistence and lock release happen uniformly in
                        // `run`'s finally section for every exit path, including
                        // this one, before the caller recurses into planning
                        // each child.
                        return Ok(LoopExit::Split { children: refreshed.children });
                    }

                    match mode {
                        Mode::Plan => {
                            let plan_path = self.config.plan_path(id.as_str());
                            if plan_path.exists() {
                                if let Err(err) = self.issue_store.transition(id, IssueState::Planned).await {
                                    tracing::warn!(issue = %id, error = %err, "plan transition failed");
                                }
                                return Ok(LoopExit::Planned);
                            }
                            return Ok(LoopExit::PlanNotProduced);
                        }
                        Mode::Build => {
                            let criteria_met =
                                self.issue_store.check_acceptance_criteria(id).await.map_err(store_err)?;
                            if criteria_met {
                                let gate = pre_complete_gate::run(
                                    &self.config.fix_commands,
                                    &self.config.test_command,
                                    &self.config.issues_dir,
                                )
                                .await;
                                if gate.passed() {
                                    self.issue_store.transition(id, IssueState::Completed).await?;
                                    self.run_verify(id).await;
                                    self.check_auto_audit_trigger().await;
                                    return Ok(LoopExit::BuildCompleted);
                                }
                            }
                            *iteration += 1;
                            continue;
                        }
                    }
                }
            }
        }
    }

    async fn run_verify(&self, id: &IssueId) {
        let Some(verifier) = self.verifier else { return };
        let Ok(mut issue) = self.issue_store.fetch(id).await else { return };
        let state_before = issue.state();
        match verifier.verify(&issue).await {
            Ok(outcome) => {
                if let Err(err) = crate::verify::apply(&mut issue, &outcome, self.config.max_verify_retries) {
                    tracing::warn!(issue = %id, error = %err, "verify state application failed");
                    return;
                }
                if issue.state() != state_before {
                    if let Err(err) = self.issue_store.transition(id, issue.state()).await {
                        tracing::warn!(issue = %id, error = %err, "verify outcome transition failed");
                    }
                }
                let _ = self
                    .issue_store
                    .write(
                        id,
                        IssuePatch { verify_count: Some(issue.verify_count), verify_exhausted: Some(issue.verify_exhausted), ..Default::default() },
                    )
                    .await;
            }
            Err(err) => {
                tracing::warn!(issue = %id, error = %err, "verify failed");
            }
        }
    }

    /// Called once per successful build exit, regardless of whether a
    /// `Verifier` is wired in or what it returns — the audit gate's
    /// completed count tracks builds reaching `Completed`, not verifies.
    async fn check_auto_audit_trigger(&self) {
        let store = crate::audit_gate_store::AuditGateStore::new(self.config.audit_gate_path());
        let audit_after_n_completed = self.config.audit_after_n_completed;
        let now = Utc::now();
        let _ = store
            .update(move |mut gate| {
                gate.increment_completed();
                if gate.check_auto_trigger(audit_after_n_completed) {
                    gate.trigger(AuditTrigger::Auto, now);
                }
                gate
            })
            .await;
    }
}

fn store_err(err: crate::traits::IssueStoreError) -> Error {
    Error::Store(Box::new(err))
}

fn emit_stats_marker(total_input_tokens: u64, total_output_tokens: u64, context_size: u64, iteration: u32) {
    println!(
        "__BARF_STATS__:{}",
        serde_json::json!({
            "totalInputTokens": total_input_tokens,
            "totalOutputTokens": total_output_tokens,
            "contextSize": context_size,
            "iteration": iteration,
        })
    );
}

#[cfg(test)]
#[path = "iteration_loop_tests.rs"]
mod tests;
