// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder [`AgentClient`] wired in until a real model provider is
//! configured. Fails fast instead of silently never producing progress.

use async_trait::async_trait;
use barf_engine::{AgentClient, AgentClientError, AgentMessage};
use tokio::sync::mpsc;

pub struct UnconfiguredAgentClient;

#[async_trait]
impl AgentClient for UnconfiguredAgentClient {
    async fn run(
        &self,
        _prompt: &str,
        _model: &str,
        _tx: mpsc::Sender<AgentMessage>,
    ) -> Result<(), AgentClientError> {
        Err(AgentClientError::SpawnFailed(
            "no agent provider configured; set one up before running plan/build/run".to_string(),
        ))
    }

    async fn interrupt(&self) -> Result<(), AgentClientError> {
        Ok(())
    }
}
