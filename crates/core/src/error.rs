// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the core and engine crates.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::issue::IssueState;

/// Errors surfaced by the core data model and propagated up through the
/// engine's component boundaries.
///
/// Per the propagation policy: `InvalidTransition`, `ProviderIo`,
/// `RateLimit`, and `AgentError` are expected to reach the caller.
/// `ContextOverflow` is caught at the iteration boundary and never escapes
/// `IterationLoop::run`. `Cancelled` unwinds cleanly and is not itself an
/// error condition callers need to recover from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: IssueState, to: IssueState },

    #[error("provider I/O error: {0}")]
    ProviderIo(#[from] std::io::Error),

    #[error("issue store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Internal-only: raised by the context-budget stream consumer to
    /// unwind to the outcome dispatcher. Never propagates past
    /// `IterationLoop::run`.
    #[error("context overflow at {tokens} tokens")]
    ContextOverflow { tokens: u64 },

    #[error("rate limited{}", resets_at.map(|t| format!(" until {t}")).unwrap_or_default())]
    RateLimit { resets_at: Option<DateTime<Utc>> },

    #[error("agent error: {message}")]
    AgentError { message: String },

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
