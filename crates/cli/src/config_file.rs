// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads `barf.toml`, the lowest-precedence layer under environment
//! variables and CLI flags (see [`barf_core::Config::apply_env_overrides`]).

use std::collections::HashMap;
use std::path::Path;

use barf_core::Config;
use serde::Deserialize;

/// Mirrors [`Config`] field-for-field, but every field is optional so a
/// `barf.toml` only needs to name what it wants to override.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    issues_dir: Option<String>,
    plan_dir: Option<String>,
    barf_dir: Option<String>,
    prompt_dir: Option<String>,
    context_usage_percent: Option<u8>,
    max_auto_splits: Option<u32>,
    max_verify_retries: Option<u32>,
    max_iterations: Option<u32>,
    claude_timeout_secs: Option<u64>,
    test_command: Option<String>,
    fix_commands: Option<Vec<String>>,
    plan_model: Option<String>,
    build_model: Option<String>,
    split_model: Option<String>,
    extended_context_model: Option<String>,
    triage_model: Option<String>,
    audit_model: Option<String>,
    audit_after_n_completed: Option<u32>,
    model_context_limits: Option<HashMap<String, u64>>,
}

/// Build the effective [`Config`]: built-in defaults, then `barf.toml` in
/// `project_root` if present, then environment variables. CLI flags are
/// applied by the caller afterward, as the highest-precedence layer.
pub fn load(project_root: &Path) -> anyhow::Result<Config> {
    let mut config = Config::default();
    config.issues_dir = project_root.join("issues");
    config.plan_dir = project_root.join("plans");
    config.barf_dir = project_root.join(".barf");
    config.prompt_dir = project_root.join("prompts");

    let path = project_root.join("barf.toml");
    if let Ok(raw) = std::fs::read_to_string(&path) {
        let file: ConfigFile = toml::from_str(&raw)
            .map_err(|err| anyhow::anyhow!("failed to parse {}: {err}", path.display()))?;
        apply(&mut config, file, project_root);
    }

    Ok(config.apply_env_overrides())
}

fn apply(config: &mut Config, file: ConfigFile, project_root: &Path) {
    if let Some(v) = file.issues_dir {
        config.issues_dir = project_root.join(v);
    }
    if let Some(v) = file.plan_dir {
        config.plan_dir = project_root.join(v);
    }
    if let Some(v) = file.barf_dir {
        config.barf_dir = project_root.join(v);
    }
    if let Some(v) = file.prompt_dir {
        config.prompt_dir = project_root.join(v);
    }
    if let Some(v) = file.context_usage_percent {
        config.context_usage_percent = v;
    }
    if let Some(v) = file.max_auto_splits {
        config.max_auto_splits = v;
    }
    if let Some(v) = file.max_verify_retries {
        config.max_verify_retries = v;
    }
    if let Some(v) = file.max_iterations {
        config.max_iterations = v;
    }
    if let Some(v) = file.claude_timeout_secs {
        config.claude_timeout_secs = v;
    }
    if let Some(v) = file.test_command {
        config.test_command = v;
    }
    if let Some(v) = file.fix_commands {
        config.fix_commands = v;
    }
    if let Some(v) = file.plan_model {
        config.plan_model = v;
    }
    if let Some(v) = file.build_model {
        config.build_model = v;
    }
    if let Some(v) = file.split_model {
        config.split_model = v;
    }
    if let Some(v) = file.extended_context_model {
        config.extended_context_model = v;
    }
    if let Some(v) = file.triage_model {
        config.triage_model = v;
    }
    if let Some(v) = file.audit_model {
        config.audit_model = v;
    }
    if let Some(v) = file.audit_after_n_completed {
        config.audit_after_n_completed = v;
    }
    if let Some(v) = file.model_context_limits {
        config.model_context_limits = v;
    }
}

#[cfg(test)]
#[path = "config_file_tests.rs"]
mod tests;
