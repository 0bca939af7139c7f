// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The gate guarding `IN_PROGRESS -> COMPLETED`: best-effort fix commands
//! followed by a hard test-command check.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

const SNIPPET_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct TestFailure {
    pub command: String,
    pub output: CommandOutput,
}

#[derive(Debug, Clone)]
pub enum GateResult {
    Passed,
    Failed(TestFailure),
}

impl GateResult {
    pub fn passed(&self) -> bool {
        matches!(self, GateResult::Passed)
    }
}

/// Run `fix_commands` (best-effort, exit codes ignored) then, if
/// `test_command` is non-empty, run it and gate on its exit code.
pub async fn run(fix_commands: &[String], test_command: &str, cwd: &Path) -> GateResult {
    for command in fix_commands {
        let output = run_command(command, cwd).await;
        match output {
            Ok(output) if output.exit_code != 0 => {
                tracing::warn!(command = %command, exit_code = output.exit_code, "fix command exited non-zero");
            }
            Err(err) => {
                tracing::warn!(command = %command, error = %err, "fix command failed to spawn");
            }
            Ok(_) => {}
        }
    }

    if test_command.is_empty() {
        return GateResult::Passed;
    }

    match run_command(test_command, cwd).await {
        Ok(output) if output.exit_code == 0 => GateResult::Passed,
        Ok(output) => {
            GateResult::Failed(TestFailure { command: test_command.to_string(), output })
        }
        Err(err) => GateResult::Failed(TestFailure {
            command: test_command.to_string(),
            output: CommandOutput { exit_code: -1, stdout: String::new(), stderr: err.to_string() },
        }),
    }
}

/// Spawn `sh -c "<command>"`, piping and capturing stdout/stderr. One
/// spawn-and-wait per command; no shell-language interpretation of our
/// own — the command string is opaque and handed straight to the host
/// shell.
async fn run_command(command: &str, cwd: &Path) -> std::io::Result<CommandOutput> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let output = child.wait_with_output().await?;
    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: truncate_snippet(&output.stdout),
        stderr: truncate_snippet(&output.stderr),
    })
}

fn truncate_snippet(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    if s.len() <= SNIPPET_LIMIT {
        s.into_owned()
    } else {
        let mut end = SNIPPET_LIMIT.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}

#[cfg(test)]
#[path = "pre_complete_gate_tests.rs"]
mod tests;
