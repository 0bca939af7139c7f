// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot classification of a newly created issue: does it need an
//! interview before planning can proceed?

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    #[error("triage classifier error: {0}")]
    Classifier(String),
}

/// The classifier itself is an external collaborator: it is just one more
/// agent call, made with `triage_model`, so no concrete implementation
/// ships here.
#[async_trait]
pub trait TriageClassifier: Send + Sync {
    async fn classify(&self, title: &str, body: &str) -> Result<bool, TriageError>;
}

/// Run triage and return the `needs_interview` verdict to store on the
/// issue. Best-effort from the orchestrator's point of view: a
/// classifier error leaves `needs_interview` unset rather than blocking
/// issue creation.
pub async fn run(classifier: &dyn TriageClassifier, title: &str, body: &str) -> Option<bool> {
    match classifier.classify(title, body).await {
        Ok(needs_interview) => Some(needs_interview),
        Err(err) => {
            tracing::warn!(error = %err, "triage classification failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "triage_tests.rs"]
mod tests;
