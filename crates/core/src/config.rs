// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide configuration: a single struct, built once at startup.
//!
//! Every option in this struct has a documented default. Construction
//! layers (lowest to highest precedence) built-in defaults, then an
//! already-parsed config file (parsing itself lives outside this crate),
//! then environment variables, then explicit overrides (e.g. CLI flags).
//! No component reads `std::env::var` on its own after `Config` exists.

use std::collections::HashMap;
use std::path::PathBuf;

/// All recognized configuration options (section 6 of the design).
#[derive(Debug, Clone)]
pub struct Config {
    pub issues_dir: PathBuf,
    pub plan_dir: PathBuf,
    pub barf_dir: PathBuf,
    pub prompt_dir: PathBuf,

    /// Global overflow threshold, 1-100.
    pub context_usage_percent: u8,
    pub max_auto_splits: u32,
    pub max_verify_retries: u32,
    /// 0 = unlimited.
    pub max_iterations: u32,
    /// Seconds; 0 disables the per-iteration timeout.
    pub claude_timeout_secs: u64,

    /// Empty string skips the test gate.
    pub test_command: String,
    pub fix_commands: Vec<String>,

    pub plan_model: String,
    pub build_model: String,
    pub split_model: String,
    pub extended_context_model: String,
    pub triage_model: String,
    pub audit_model: String,

    /// 0 disables auto-triggered audits.
    pub audit_after_n_completed: u32,

    /// Per-model context window overrides, consulted before the built-in
    /// table in `ContextBudget`.
    pub model_context_limits: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        let project_root = PathBuf::from(".");
        Self {
            issues_dir: project_root.join("issues"),
            plan_dir: project_root.join("plans"),
            barf_dir: project_root.join(".barf"),
            prompt_dir: project_root.join("prompts"),
            context_usage_percent: 75,
            max_auto_splits: 3,
            max_verify_retries: 3,
            max_iterations: 0,
            claude_timeout_secs: 3600,
            test_command: String::new(),
            fix_commands: Vec::new(),
            plan_model: "claude-sonnet-4-6".to_string(),
            build_model: "claude-sonnet-4-6".to_string(),
            split_model: "claude-sonnet-4-6".to_string(),
            extended_context_model: "claude-opus-4-6".to_string(),
            triage_model: "claude-sonnet-4-6".to_string(),
            audit_model: "claude-opus-4-6".to_string(),
            audit_after_n_completed: 0,
            model_context_limits: HashMap::new(),
        }
    }
}

impl Config {
    /// Apply environment variable overrides. Called exactly once, while
    /// building the `Config` at process startup.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("BARF_ISSUES_DIR") {
            self.issues_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("BARF_PLAN_DIR") {
            self.plan_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("BARF_DIR") {
            self.barf_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("BARF_PROMPT_DIR") {
            self.prompt_dir = PathBuf::from(dir);
        }
        if let Ok(pct) = std::env::var("BARF_CONTEXT_USAGE_PERCENT") {
            if let Ok(pct) = pct.parse() {
                self.context_usage_percent = pct;
            }
        }
        if let Ok(n) = std::env::var("BARF_MAX_AUTO_SPLITS") {
            if let Ok(n) = n.parse() {
                self.max_auto_splits = n;
            }
        }
        if let Ok(n) = std::env::var("BARF_MAX_ITERATIONS") {
            if let Ok(n) = n.parse() {
                self.max_iterations = n;
            }
        }
        self
    }

    pub fn lock_path(&self, id: &str) -> PathBuf {
        self.barf_dir.join(format!("{id}.lock"))
    }

    pub fn audit_gate_path(&self) -> PathBuf {
        self.barf_dir.join("audit-gate.json")
    }

    pub fn sessions_index_path(&self) -> PathBuf {
        self.barf_dir.join("sessions.jsonl")
    }

    pub fn stream_dump_path(&self, id: &str) -> PathBuf {
        self.barf_dir.join("streams").join(format!("{id}.jsonl"))
    }

    pub fn plan_path(&self, id: &str) -> PathBuf {
        self.plan_dir.join(format!("{id}.md"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
