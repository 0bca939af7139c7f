// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers invoked by `main`'s dispatch. Each builds the
//! collaborators an [`Orchestrator`] needs and drives one issue, or all
//! eligible issues, to a stopping point.

use barf_core::Config;
use barf_engine::{ContextBudget, IssueStore, Mode, Orchestrator};

use crate::exit_error::ExitError;
use crate::file_issue_store::FileIssueStore;
use crate::prompts::FilePromptComposer;
use crate::unconfigured_agent::UnconfiguredAgentClient;

pub async fn init(config: &Config) -> Result<(), ExitError> {
    for dir in [&config.issues_dir, &config.plan_dir, &config.barf_dir, &config.prompt_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| ExitError::new(1, format!("failed to create {}: {err}", dir.display())))?;
    }
    println!("initialized project at {}", config.issues_dir.parent().unwrap_or(&config.issues_dir).display());
    Ok(())
}

pub async fn new_issue(
    config: &Config,
    title: &str,
    body: Option<&str>,
    parent: Option<&str>,
) -> Result<(), ExitError> {
    let store = FileIssueStore::new(&config.issues_dir);
    let parent_id = parent.map(barf_core::IssueId::new);
    let id = store
        .create_issue(title, body, parent_id.as_ref())
        .await
        .map_err(|err| ExitError::new(1, format!("failed to create issue: {err}")))?;
    println!("created issue {id}");
    Ok(())
}

fn build_orchestrator<'a>(
    config: &'a Config,
    store: &'a FileIssueStore,
    agent: &'a UnconfiguredAgentClient,
    context_budget: &'a ContextBudget,
    prompts: &'a FilePromptComposer,
) -> Orchestrator<'a> {
    Orchestrator {
        issue_store: store,
        agent_client: agent,
        context_budget,
        prompts,
        verifier: None,
        config,
        pid: std::process::id(),
    }
}

async fn run_one(config: &Config, mode: Mode, id: Option<&str>) -> Result<(), ExitError> {
    let store = FileIssueStore::new(&config.issues_dir);
    let agent = UnconfiguredAgentClient;
    let context_budget = ContextBudget::with_limits(config.model_context_limits.clone());
    let prompts = FilePromptComposer::new(&config.prompt_dir);
    let orchestrator = build_orchestrator(config, &store, &agent, &context_budget, &prompts);

    let exit = match id {
        Some(raw) => {
            let issue_id = barf_core::IssueId::new(raw);
            let issue = store
                .fetch(&issue_id)
                .await
                .map_err(|err| ExitError::new(1, format!("{err}")))?;
            Some(
                orchestrator
                    .drive(&issue_id, mode, &issue)
                    .await
                    .map_err(|err| ExitError::new(1, format!("{err}")))?,
            )
        }
        None => orchestrator.run_once(mode).await.map_err(|err| ExitError::new(1, format!("{err}")))?,
    };

    match exit {
        Some(exit) => println!("{exit:?}"),
        None => println!("no eligible issue"),
    }
    Ok(())
}

pub async fn plan(config: &Config, id: Option<&str>) -> Result<(), ExitError> {
    run_one(config, Mode::Plan, id).await
}

pub async fn build(config: &Config, id: Option<&str>) -> Result<(), ExitError> {
    run_one(config, Mode::Build, id).await
}

/// Alternates plan and build passes until neither makes progress.
pub async fn run_loop(config: &Config) -> Result<(), ExitError> {
    let store = FileIssueStore::new(&config.issues_dir);
    let agent = UnconfiguredAgentClient;
    let context_budget = ContextBudget::with_limits(config.model_context_limits.clone());
    let prompts = FilePromptComposer::new(&config.prompt_dir);
    let orchestrator = build_orchestrator(config, &store, &agent, &context_budget, &prompts);

    loop {
        let plan_exit = orchestrator.run_once(Mode::Plan).await.map_err(|err| ExitError::new(1, format!("{err}")))?;
        let build_exit =
            orchestrator.run_once(Mode::Build).await.map_err(|err| ExitError::new(1, format!("{err}")))?;

        if let Some(exit) = &plan_exit {
            println!("plan: {exit:?}");
        }
        if let Some(exit) = &build_exit {
            println!("build: {exit:?}");
        }
        if plan_exit.is_none() && build_exit.is_none() {
            println!("nothing left to do");
            return Ok(());
        }
    }
}

pub async fn status(config: &Config) -> Result<(), ExitError> {
    let store = FileIssueStore::new(&config.issues_dir);
    let issues = store.list_issues().await.map_err(|err| ExitError::new(1, format!("{err}")))?;

    if issues.is_empty() {
        println!("no issues");
        return Ok(());
    }

    println!("{}", crate::color::header("id       state        title"));
    for issue in issues {
        println!(
            "{:<8} {:<12} {}",
            crate::color::literal(issue.id.as_str()),
            crate::color::context(&issue.state().to_string()),
            issue.title
        );
    }
    Ok(())
}
