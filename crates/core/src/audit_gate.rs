// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-wide audit gate: state and pure transitions.
//!
//! File I/O (reading `.barf/audit-gate.json`, writing it back under an
//! advisory lock) lives in `barf-engine`; this module only owns the data
//! and the transition rules, which are pure and so belong where they can
//! be property-tested without touching a filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::IssueId;
use crate::session::AuditTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditGateState {
    Running,
    Draining,
    Auditing,
    Fixing,
}

crate::simple_display! {
    AuditGateState {
        Running => "running",
        Draining => "draining",
        Auditing => "auditing",
        Fixing => "fixing",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditGate {
    pub state: AuditGateState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<AuditTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_since_last_audit: u32,
    #[serde(default)]
    pub audit_fix_issue_ids: Vec<IssueId>,
}

impl Default for AuditGate {
    fn default() -> Self {
        Self {
            state: AuditGateState::Running,
            triggered_by: None,
            triggered_at: None,
            completed_since_last_audit: 0,
            audit_fix_issue_ids: Vec::new(),
        }
    }
}

impl AuditGate {
    /// Parse a persisted document; any failure (missing file content,
    /// malformed JSON, unknown fields breaking a stricter schema) yields
    /// the default `running` gate rather than propagating.
    pub fn from_json_or_default(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    /// No-op unless `running`. Returns whether the trigger took effect.
    pub fn trigger(&mut self, by: AuditTrigger, at: DateTime<Utc>) -> bool {
        if self.state != AuditGateState::Running {
            return false;
        }
        self.state = AuditGateState::Draining;
        self.triggered_by = Some(by);
        self.triggered_at = Some(at);
        true
    }

    /// `draining` → `auditing` once active sessions have drained.
    /// No-op (returns false) from any other state.
    pub fn transition_to_auditing(&mut self) -> bool {
        if self.state != AuditGateState::Draining {
            return false;
        }
        self.state = AuditGateState::Auditing;
        true
    }

    /// Audit completed with no findings: back to `running`, counter
    /// zeroed. Only legal from `auditing`.
    pub fn resolve_no_findings(&mut self) -> bool {
        if self.state != AuditGateState::Auditing {
            return false;
        }
        self.reset();
        true
    }

    /// Audit completed with findings: `auditing` → `fixing`, recording
    /// the fix issue ids.
    pub fn transition_to_fixing(&mut self, fix_issue_ids: Vec<IssueId>) -> bool {
        if self.state != AuditGateState::Auditing {
            return false;
        }
        self.state = AuditGateState::Fixing;
        self.audit_fix_issue_ids = fix_issue_ids;
        true
    }

    /// All fix issues resolved: `fixing` → `running`, counter zeroed.
    pub fn resolve_fixing_done(&mut self) -> bool {
        if self.state != AuditGateState::Fixing {
            return false;
        }
        self.reset();
        true
    }

    /// Cancel from any non-`running` state back to `running`, clearing
    /// fix-issue ids and trigger metadata but preserving
    /// `completed_since_last_audit`.
    pub fn cancel(&mut self) -> bool {
        if self.state == AuditGateState::Running {
            return false;
        }
        self.state = AuditGateState::Running;
        self.triggered_by = None;
        self.triggered_at = None;
        self.audit_fix_issue_ids.clear();
        true
    }

    /// Unconditional return to `running` with the counter zeroed. Used
    /// by `resolve_no_findings` and `resolve_fixing_done`; exposed
    /// directly for callers (like Orchestrator bootstrapping state) that
    /// don't need the state-guard.
    pub fn reset(&mut self) {
        self.state = AuditGateState::Running;
        self.triggered_by = None;
        self.triggered_at = None;
        self.completed_since_last_audit = 0;
        self.audit_fix_issue_ids.clear();
    }

    pub fn increment_completed(&mut self) {
        self.completed_since_last_audit += 1;
    }

    /// Pure check: should an auto-trigger fire given `audit_after_n`?
    /// Does not mutate; callers still call `trigger(Auto, ..)` themselves.
    pub fn check_auto_trigger(&self, audit_after_n: u32) -> bool {
        audit_after_n > 0
            && self.state == AuditGateState::Running
            && self.completed_since_last_audit >= audit_after_n
    }

    /// Whether normal build/plan work on `issue` is admitted right now.
    pub fn admits(&self, issue: &crate::issue::Issue, parent_of: &std::collections::HashMap<IssueId, IssueId>) -> bool {
        match self.state {
            AuditGateState::Running => true,
            AuditGateState::Draining | AuditGateState::Auditing => false,
            AuditGateState::Fixing => issue.inherits_fix_admission(&self.audit_fix_issue_ids, parent_of),
        }
    }
}

#[cfg(test)]
#[path = "audit_gate_tests.rs"]
mod tests;
