// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk contents of a per-issue lock file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::IssueState;

/// The operation the lock holder is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    Plan,
    Build,
    Split,
}

crate::simple_display! {
    LockMode {
        Plan => "plan",
        Build => "build",
        Split => "split",
    }
}

/// Contents of `<barfDir>/<id>.lock` while the lock is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
    pub state_at_acquire: IssueState,
    pub mode: LockMode,
}

impl LockInfo {
    pub fn new(pid: u32, acquired_at: DateTime<Utc>, state_at_acquire: IssueState, mode: LockMode) -> Self {
        Self { pid, acquired_at, state_at_acquire, mode }
    }
}

#[cfg(test)]
#[path = "lock_info_tests.rs"]
mod tests;
