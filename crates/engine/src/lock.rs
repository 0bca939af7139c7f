// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-issue mutual exclusion via exclusive-create lock files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use barf_core::{Clock, IssueId, IssueState, LockInfo, LockMode};
use chrono::{DateTime, Utc};
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Result of [`Lock::acquire`].
#[derive(Debug)]
pub enum AcquireOutcome {
    Acquired,
    Busy(LockInfo),
    StaleReclaimed(LockInfo),
}

impl AcquireOutcome {
    pub fn acquired(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired | AcquireOutcome::StaleReclaimed(_))
    }
}

pub struct Lock<'a> {
    barf_dir: &'a Path,
}

impl<'a> Lock<'a> {
    pub fn new(barf_dir: &'a Path) -> Self {
        Self { barf_dir }
    }

    fn path(&self, id: &IssueId) -> PathBuf {
        self.barf_dir.join(format!("{}.lock", id.as_str()))
    }

    /// Attempt to acquire the lock for `id`. Never blocks: a live holder
    /// yields `Busy`, never a wait.
    pub fn acquire<C: Clock>(
        &self,
        id: &IssueId,
        mode: LockMode,
        state_at_acquire: IssueState,
        pid: u32,
        clock: &C,
    ) -> io::Result<AcquireOutcome> {
        let path = self.path(id);
        fs::create_dir_all(self.barf_dir)?;

        let info = LockInfo::new(pid, clock_now_utc(clock), state_at_acquire, mode);
        match write_new(&path, &info) {
            Ok(()) => return Ok(AcquireOutcome::Acquired),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }

        let existing = read_lock(&path)?;
        let Some(existing) = existing else {
            // File vanished between the failed create and our read; the
            // previous holder released concurrently. Try once more.
            return match write_new(&path, &info) {
                Ok(()) => Ok(AcquireOutcome::Acquired),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    Ok(AcquireOutcome::Busy(read_lock(&path)?.unwrap_or(info)))
                }
                Err(err) => Err(err),
            };
        };

        if pid_alive(existing.pid) {
            return Ok(AcquireOutcome::Busy(existing));
        }

        // Stale: previous holder is confirmed dead. Replace atomically.
        let tmp = path.with_extension("lock.tmp");
        write_new(&tmp, &info)?;
        fs::rename(&tmp, &path)?;
        Ok(AcquireOutcome::StaleReclaimed(existing))
    }

    /// Delete the lock file. Absence is not an error.
    pub fn release(&self, id: &IssueId) -> io::Result<()> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn write_new(path: &Path, info: &LockInfo) -> io::Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;
    let bytes = serde_json::to_vec(info).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    file.write_all(&bytes)
}

fn read_lock(path: &Path) -> io::Result<Option<LockInfo>> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Zero-signal liveness probe against the local process table.
fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

pub(crate) fn clock_now_utc<C: Clock>(clock: &C) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(clock.epoch_ms() as i64).unwrap_or_else(Utc::now)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
