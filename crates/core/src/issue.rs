// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue identifier, lifecycle state machine, and the issue record itself.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Stable identifier for an issue, assigned by the issue store.
///
/// Unlike [`crate::id::IdBuf`]-backed IDs, issue ids are not generated by
/// this crate — they come from the external issue store (e.g. a filename
/// stem like `"001"`) — so this is a plain string wrapper, not a
/// `define_id!` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueId(pub String);

impl IssueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IssueId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IssueId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for IssueId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IssueId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for IssueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    New,
    Planned,
    InProgress,
    Completed,
    Verified,
    Stuck,
    Split,
}

crate::simple_display! {
    IssueState {
        New => "new",
        Planned => "planned",
        InProgress => "in_progress",
        Completed => "completed",
        Verified => "verified",
        Stuck => "stuck",
        Split => "split",
    }
}

impl IssueState {
    /// True once an issue has left the scheduling pool for good.
    ///
    /// `Completed` is deliberately excluded: Verify can still reopen it
    /// into `InProgress` on a failed verification.
    pub fn is_terminal(self) -> bool {
        matches!(self, IssueState::Split | IssueState::Verified)
    }

    /// Whether `to` is a legal transition target from `self`.
    ///
    /// This is the single validator every component must go through;
    /// nothing else in this crate (or callers) is permitted to assign
    /// `Issue::state` directly.
    pub fn can_transition_to(self, to: IssueState) -> bool {
        use IssueState::*;
        matches!(
            (self, to),
            (New, Planned)
                | (New, Stuck)
                | (New, Split)
                | (Planned, InProgress)
                | (Planned, Stuck)
                | (Planned, Split)
                | (InProgress, Completed)
                | (InProgress, Stuck)
                | (InProgress, Split)
                | (Stuck, New)
                | (Stuck, Planned)
                | (Stuck, Split)
                | (Completed, Verified)
                | (Completed, InProgress)
        )
    }
}

/// The unit of work driven through plan → build → verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub body: String,
    state: IssueState,
    pub parent: Option<IssueId>,
    #[serde(default)]
    pub children: Vec<IssueId>,
    #[serde(default)]
    pub split_count: u32,
    #[serde(default)]
    pub force_split: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_usage_percent: Option<u8>,
    #[serde(default)]
    pub verify_count: u32,
    #[serde(default)]
    pub is_verify_fix: bool,
    #[serde(default)]
    pub verify_exhausted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_interview: Option<bool>,
    #[serde(default)]
    pub total_input_tokens: u64,
    #[serde(default)]
    pub total_output_tokens: u64,
    #[serde(default)]
    pub total_duration_seconds: u64,
    #[serde(default)]
    pub total_iterations: u32,
    #[serde(default)]
    pub run_count: u32,
}

impl Issue {
    pub fn new(id: impl Into<IssueId>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            state: IssueState::New,
            parent: None,
            children: Vec::new(),
            split_count: 0,
            force_split: false,
            context_usage_percent: None,
            verify_count: 0,
            is_verify_fix: false,
            verify_exhausted: false,
            needs_interview: None,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_duration_seconds: 0,
            total_iterations: 0,
            run_count: 0,
        }
    }

    pub fn state(&self) -> IssueState {
        self.state
    }

    /// Validate and apply a state transition.
    ///
    /// On rejection, `self.state` is left unchanged and the error carries
    /// both endpoints for the caller to log or surface.
    pub fn transition(&mut self, to: IssueState) -> Result<(), Error> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }

    /// Accumulate per-iteration stats for one `IterationLoop` run.
    /// Counters are monotonically non-decreasing; this is the only place
    /// that mutates them. `run_count` bumps once per call, since this is
    /// called exactly once per run, not once per iteration.
    pub fn accumulate_stats(
        &mut self,
        input_tokens: u64,
        output_tokens: u64,
        duration_seconds: u64,
        iterations: u32,
    ) {
        self.total_input_tokens += input_tokens;
        self.total_output_tokens += output_tokens;
        self.total_duration_seconds += duration_seconds;
        self.total_iterations += iterations;
        self.run_count += 1;
    }

    /// True if this issue, or any ancestor reachable through `parent_of`,
    /// is a recognized audit fix issue. Used for transitive fixing-state
    /// admission (see DESIGN.md).
    pub fn inherits_fix_admission(
        &self,
        fix_issue_ids: &[IssueId],
        parent_of: &HashMap<IssueId, IssueId>,
    ) -> bool {
        if self.is_verify_fix || fix_issue_ids.contains(&self.id) {
            return true;
        }
        let mut current = self.parent.clone();
        while let Some(id) = current {
            if fix_issue_ids.contains(&id) {
                return true;
            }
            current = parent_of.get(&id).cloned();
        }
        false
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct IssueBuilder => Issue {
        into {
            title: String = "test issue",
            body: String = "",
        }
        set {
            children: Vec<IssueId> = Vec::new(),
            split_count: u32 = 0,
            force_split: bool = false,
            verify_count: u32 = 0,
            is_verify_fix: bool = false,
            verify_exhausted: bool = false,
            total_input_tokens: u64 = 0,
            total_output_tokens: u64 = 0,
            total_duration_seconds: u64 = 0,
            total_iterations: u32 = 0,
            run_count: u32 = 0,
        }
        option {
            parent: IssueId = None,
            context_usage_percent: u8 = None,
            needs_interview: bool = None,
        }
        computed {
            id: IssueId = IssueId::new("test-1"),
            state: IssueState = IssueState::New,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Issue {
    /// Set the state directly, bypassing the transition validator.
    /// Test-only: exercising dispatch logic from an arbitrary starting
    /// state without re-deriving a legal transition path each time.
    pub fn set_state_for_test(&mut self, state: IssueState) {
        self.state = state;
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
