// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed persistence for [`barf_core::AuditGate`].
//!
//! Writes go through an `fs2` advisory exclusive lock on a sidecar
//! `.lock` file, the same primitive the daemon's startup sequence uses
//! to guard its own state files. The lock is held only for the
//! duration of one read-modify-write, not a process-lifetime hold.

use std::fs;
use std::io;
use std::path::PathBuf;

use fs2::FileExt;

use barf_core::AuditGate;

pub struct AuditGateStore {
    path: PathBuf,
}

impl AuditGateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> AuditGate {
        match fs::read_to_string(&self.path) {
            Ok(raw) => AuditGate::from_json_or_default(&raw),
            Err(_) => AuditGate::default(),
        }
    }

    /// Read-modify-write under the advisory lock. `f` receives the
    /// current gate and returns the new value to persist.
    pub async fn update<F>(&self, f: F) -> io::Result<AuditGate>
    where
        F: FnOnce(AuditGate) -> AuditGate + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let lock_path = path.with_extension("json.lock");
            let lock_file = fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
            lock_file.lock_exclusive()?;

            let result = (|| {
                let current = match fs::read_to_string(&path) {
                    Ok(raw) => AuditGate::from_json_or_default(&raw),
                    Err(_) => AuditGate::default(),
                };
                let next = f(current);
                let bytes = serde_json::to_vec_pretty(&next)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                fs::write(&path, bytes)?;
                Ok(next)
            })();

            let _ = FileExt::unlock(&lock_file);
            result
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

#[cfg(test)]
#[path = "audit_gate_store_tests.rs"]
mod tests;
