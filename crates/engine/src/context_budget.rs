// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token accounting and the agent-stream consumer that interrupts on
//! overflow.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::traits::{AgentClient, AgentMessage};

const DEFAULT_CONTEXT_LIMIT: u64 = 200_000;

/// Per-model context window table with a default fallback.
#[derive(Debug, Clone)]
pub struct ContextBudget {
    limits: HashMap<String, u64>,
    default_limit: u64,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self { limits: HashMap::new(), default_limit: DEFAULT_CONTEXT_LIMIT }
    }
}

impl ContextBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: HashMap<String, u64>) -> Self {
        Self { limits, default_limit: DEFAULT_CONTEXT_LIMIT }
    }

    pub fn register(&mut self, model: impl Into<String>, limit_tokens: u64) {
        self.limits.insert(model.into(), limit_tokens);
    }

    pub fn limit(&self, model: &str) -> u64 {
        self.limits.get(model).copied().unwrap_or(self.default_limit)
    }

    /// `threshold(model, percent) = floor(percent/100 * limit)`.
    pub fn threshold(&self, model: &str, percent: u8) -> u64 {
        self.limit(model) * percent as u64 / 100
    }
}

/// Outcome of consuming one agent run's message stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Success { context_size: u64, output_tokens: u64 },
    Overflow { context_size: u64, output_tokens: u64 },
    Error { context_size: u64, output_tokens: u64 },
    RateLimited { context_size: u64, output_tokens: u64, resets_at: Option<DateTime<Utc>> },
}

impl StreamOutcome {
    pub fn context_size(&self) -> u64 {
        match self {
            StreamOutcome::Success { context_size, .. }
            | StreamOutcome::Overflow { context_size, .. }
            | StreamOutcome::Error { context_size, .. }
            | StreamOutcome::RateLimited { context_size, .. } => *context_size,
        }
    }

    pub fn output_tokens(&self) -> u64 {
        match self {
            StreamOutcome::Success { output_tokens, .. }
            | StreamOutcome::Overflow { output_tokens, .. }
            | StreamOutcome::Error { output_tokens, .. }
            | StreamOutcome::RateLimited { output_tokens, .. } => *output_tokens,
        }
    }

    pub fn kind(&self) -> StreamOutcomeKind {
        self.into()
    }
}

/// Tag-only variant of [`StreamOutcome`] for dispatch tables that don't
/// need the usage figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcomeKind {
    Success,
    Overflow,
    Error,
    RateLimited,
}

impl From<&StreamOutcome> for StreamOutcomeKind {
    fn from(outcome: &StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Success { .. } => StreamOutcomeKind::Success,
            StreamOutcome::Overflow { .. } => StreamOutcomeKind::Overflow,
            StreamOutcome::Error { .. } => StreamOutcomeKind::Error,
            StreamOutcome::RateLimited { .. } => StreamOutcomeKind::RateLimited,
        }
    }
}

/// Optional side channels the consumer writes to while draining a stream.
#[derive(Default)]
pub struct StreamSinks<'a> {
    pub dump_path: Option<&'a Path>,
    pub progress_tty: bool,
}

/// Drain `rx` to completion (or overflow, or cancellation), interrupting
/// the agent via `client` when the running token total crosses
/// `threshold`.
///
/// Only main-context turns (no `parent_tool_use_id`) count toward the
/// running total, which is the maximum, across such turns, of
/// `input + cache_creation_input + cache_read_input`.
pub async fn consume(
    client: &dyn AgentClient,
    mut rx: mpsc::Receiver<AgentMessage>,
    threshold: u64,
    cancel: CancellationToken,
    sinks: StreamSinks<'_>,
) -> StreamOutcome {
    let mut context_size: u64 = 0;
    let mut output_tokens: u64 = 0;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let _ = client.interrupt().await;
                drain_until_closed(&mut rx).await;
                return StreamOutcome::Error { context_size, output_tokens };
            }

            message = rx.recv() => {
                let Some(message) = message else {
                    return StreamOutcome::Success { context_size, output_tokens };
                };

                if let Some(path) = sinks.dump_path {
                    dump_message(path, &message);
                }

                match message {
                    AgentMessage::Assistant {
                        input_tokens,
                        cache_creation_input_tokens,
                        cache_read_input_tokens,
                        parent_tool_use_id,
                    } if parent_tool_use_id.is_none() => {
                        let turn_total = input_tokens + cache_creation_input_tokens + cache_read_input_tokens;
                        context_size = context_size.max(turn_total);
                        if sinks.progress_tty {
                            print_progress(context_size, threshold);
                        }
                        if context_size >= threshold {
                            let _ = client.interrupt().await;
                            drain_until_closed(&mut rx).await;
                            return StreamOutcome::Overflow { context_size, output_tokens };
                        }
                    }
                    AgentMessage::Assistant { .. } | AgentMessage::Tool { .. } => {
                        // Sub-agent turn: excluded from main-context accounting.
                    }
                    AgentMessage::Result { output_tokens: out } => {
                        output_tokens = out;
                    }
                    AgentMessage::RateLimited { resets_at } => {
                        return StreamOutcome::RateLimited { context_size, output_tokens, resets_at };
                    }
                }
            }
        }
    }
}

async fn drain_until_closed(rx: &mut mpsc::Receiver<AgentMessage>) {
    while rx.recv().await.is_some() {}
}

fn dump_message(path: &Path, message: &AgentMessage) {
    let Some(parent) = path.parent() else { return };
    if std::fs::create_dir_all(parent).is_err() {
        return;
    }
    let Ok(mut line) = serde_json::to_vec(&debug_repr(message)) else { return };
    line.push(b'\n');
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(&line);
    }
}

fn debug_repr(message: &AgentMessage) -> serde_json::Value {
    serde_json::json!({ "debug": format!("{message:?}") })
}

fn print_progress(context_size: u64, threshold: u64) {
    eprint!("\r\x1b[Kcontext: {context_size}/{threshold} tokens");
    let _ = std::io::stderr().flush();
}

#[cfg(test)]
#[path = "context_budget_tests.rs"]
mod tests;
