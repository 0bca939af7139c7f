// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only session lifecycle log.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use barf_core::SessionIndexEvent;

/// Writer for `<barfdir>/sessions.jsonl`.
///
/// Every write is best-effort: a failure is logged and swallowed, since
/// losing observability must never crash a run in progress.
pub struct SessionIndex {
    path: PathBuf,
}

impl SessionIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, event: &SessionIndexEvent) {
        if let Err(err) = self.try_append(event) {
            tracing::warn!(error = %err, path = %self.path.display(), "session index append failed");
        }
    }

    fn try_append(&self, event: &SessionIndexEvent) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}

/// Read every event currently in the index. Used by observers and tests;
/// the engine itself only ever appends.
pub fn read_all(path: &Path) -> std::io::Result<Vec<SessionIndexEvent>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    Ok(contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
#[path = "session_index_tests.rs"]
mod tests;
