// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the prompt text handed to the agent for a given mode.
//!
//! A template named `plan.md`, `build.md`, or `split.md` under
//! `promptDir` is used verbatim as a prefix if present; otherwise a
//! minimal built-in template covers the same ground.

use std::path::PathBuf;

use barf_core::Issue;
use barf_engine::{PromptComposer, PromptMode};

pub struct FilePromptComposer {
    prompt_dir: PathBuf,
}

impl FilePromptComposer {
    pub fn new(prompt_dir: impl Into<PathBuf>) -> Self {
        Self { prompt_dir: prompt_dir.into() }
    }

    fn template(&self, mode: PromptMode) -> Option<String> {
        let name = match mode {
            PromptMode::Plan => "plan.md",
            PromptMode::Build => "build.md",
            PromptMode::Split => "split.md",
        };
        std::fs::read_to_string(self.prompt_dir.join(name)).ok()
    }

    fn builtin(mode: PromptMode) -> &'static str {
        match mode {
            PromptMode::Plan => "Write an implementation plan for this issue.",
            PromptMode::Build => "Implement this issue to completion, then run the test suite.",
            PromptMode::Split => {
                "This issue is too large for one context window. Split it into smaller \
                 child issues that together cover the same work, and record them."
            }
        }
    }
}

impl PromptComposer for FilePromptComposer {
    fn compose(&self, mode: PromptMode, issue: &Issue, iteration: u32) -> String {
        let instructions = self.template(mode).unwrap_or_else(|| Self::builtin(mode).to_string());
        format!(
            "{instructions}\n\n## Issue {id}: {title}\n\n{body}\n\n(iteration {iteration})",
            id = issue.id,
            title = issue.title,
            body = issue.body,
        )
    }
}
