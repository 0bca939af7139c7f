// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-completion verification and the re-open-on-failure policy.
//!
//! The verification strategy itself (what "passing" means, whether it
//! runs another agent pass) is an external collaborator, modeled as a
//! trait so the engine stays agnostic to how verification is performed.
//! What this module owns is the state machinery around the outcome:
//! filing fix children and deciding whether to reopen the issue.

use async_trait::async_trait;
use barf_core::{Issue, IssueId, IssueState};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub passed: bool,
    /// Issues to file as children carrying the fix for whatever Verify
    /// found, when `passed` is false and the caller wants to track them
    /// separately from the plain reopen path.
    pub fix_issue_ids: Vec<IssueId>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verifier error: {0}")]
    Verifier(String),
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, issue: &Issue) -> Result<VerifyOutcome, VerifyError>;
}

/// Applies a [`VerifyOutcome`] to `issue`'s completion-time state.
///
/// On success, transitions `Completed -> Verified`.
/// On failure, transitions `Completed -> InProgress` (clearing
/// `verify_exhausted`) unless `verify_count >= max_verify_retries`, in
/// which case the issue stays `Completed` with `verify_exhausted` set.
///
/// Never propagates: callers log the returned error and continue, per
/// the propagation policy for Verify.
pub fn apply(issue: &mut Issue, outcome: &VerifyOutcome, max_verify_retries: u32) -> Result<(), barf_core::Error> {
    issue.verify_count += 1;

    if outcome.passed {
        return issue.transition(IssueState::Verified);
    }

    if issue.verify_count >= max_verify_retries {
        issue.verify_exhausted = true;
        return Ok(());
    }

    issue.verify_exhausted = false;
    issue.transition(IssueState::InProgress)
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
