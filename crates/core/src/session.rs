// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifiers, stats snapshots, and session-index event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::IssueId;

crate::define_id! {
    /// Unique identifier for one IterationLoop invocation, from lock
    /// acquire to lock release.
    pub struct SessionId("ses-");
}

/// Snapshot of one IterationLoop run, written at session end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub final_context_size: u64,
    pub iterations: u32,
    pub model: String,
}

/// Who triggered an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTrigger {
    Dashboard,
    Cli,
    Auto,
}

crate::simple_display! {
    AuditTrigger {
        Dashboard => "dashboard",
        Cli => "cli",
        Auto => "auto",
    }
}

/// One entry in the append-only session index (`.barf/sessions.jsonl`).
///
/// Tagged by `kind` so observers can deserialize without knowing which
/// variant they're about to get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionIndexEvent {
    Start {
        session_id: SessionId,
        issue_id: IssueId,
        pid: u32,
        at: DateTime<Utc>,
        stream_byte_offset: u64,
    },
    End {
        session_id: SessionId,
        issue_id: IssueId,
        pid: u32,
        at: DateTime<Utc>,
        stream_byte_offset: u64,
        stats: SessionStats,
    },
    AutoStart {
        session_id: SessionId,
        issue_id: IssueId,
        at: DateTime<Utc>,
    },
    AutoEnd {
        session_id: SessionId,
        issue_id: IssueId,
        at: DateTime<Utc>,
    },
    Delete {
        issue_id: IssueId,
        at: DateTime<Utc>,
    },
    Archive {
        issue_id: IssueId,
        at: DateTime<Utc>,
    },
    AuditGate {
        at: DateTime<Utc>,
        transition: String,
        triggered_by: Option<AuditTrigger>,
    },
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
