//! CLI help and usage output.

use crate::prelude::*;

#[test]
fn no_args_shows_usage_and_exits_nonzero() {
    let project = Project::empty();
    project.barf().fails().stderr_has("Usage:");
}

#[test]
fn help_shows_usage() {
    let project = Project::empty();
    project.barf().args(["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn help_lists_subcommands() {
    let project = Project::empty();
    project
        .barf()
        .args(["--help"])
        .passes()
        .stdout_has("init")
        .stdout_has("plan")
        .stdout_has("build")
        .stdout_has("status");
}

#[test]
fn version_shows_version() {
    let project = Project::empty();
    project.barf().args(["--version"]).passes().stdout_has("0.2");
}
