// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point: parses arguments, loads configuration, and dispatches to
//! the command handlers. Commands return [`ExitError`] instead of calling
//! `std::process::exit` directly so `main` owns process termination.

mod color;
mod commands;
mod config_file;
mod exit_error;
mod file_issue_store;
mod prompts;
mod unconfigured_agent;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "barf", version, about = "Drives issues through plan, build, and verify.", styles = color::styles())]
struct Cli {
    /// Project root containing `issues/`, `plans/`, and `barf.toml`.
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the project's issues/plans/.barf directories.
    Init,
    /// Create a new issue.
    New {
        title: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Run one plan iteration on the next eligible issue, or a named one.
    Plan {
        id: Option<String>,
    },
    /// Run one build iteration on the next eligible issue, or a named one.
    Build {
        id: Option<String>,
    },
    /// Drive issues continuously until none are eligible.
    Run,
    /// Print every issue and its state.
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let config = config_file::load(&cli.project)
        .map_err(|err| ExitError::new(1, format!("failed to load configuration: {err}")))?;

    match cli.command {
        Command::Init => commands::init(&config).await,
        Command::New { title, body, parent } => {
            commands::new_issue(&config, &title, body.as_deref(), parent.as_deref()).await
        }
        Command::Plan { id } => commands::plan(&config, id.as_deref()).await,
        Command::Build { id } => commands::build(&config, id.as_deref()).await,
        Command::Run => commands::run_loop(&config).await,
        Command::Status => commands::status(&config).await,
    }
}
