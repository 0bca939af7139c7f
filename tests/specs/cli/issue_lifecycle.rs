//! `init` / `new` / `status` against a scratch project, plus the
//! fail-fast path when no agent provider is wired in yet.

use crate::prelude::*;

#[test]
fn init_creates_the_project_layout() {
    let project = Project::empty();
    project.barf().args(["init"]).passes();

    assert!(project.path().join("issues").is_dir());
    assert!(project.path().join("plans").is_dir());
    assert!(project.path().join(".barf").is_dir());
}

#[test]
fn new_issue_then_status_lists_it() {
    let project = Project::empty();
    project.barf().args(["init"]).passes();
    project.barf().args(["new", "add retries to the fetch loop"]).passes();

    project.barf().args(["status"]).passes().stdout_has("add retries to the fetch loop").stdout_has("new");
}

#[test]
fn status_on_an_empty_project_says_so() {
    let project = Project::empty();
    project.barf().args(["init"]).passes();
    project.barf().args(["status"]).passes().stdout_has("no issues");
}

#[test]
fn plan_without_a_configured_agent_fails_loudly() {
    let project = Project::empty();
    project.barf().args(["init"]).passes();
    project.barf().args(["new", "an issue to plan"]).passes();

    project.barf().args(["plan"]).fails().stderr_has("no agent provider configured");
}

#[test]
fn barf_toml_overrides_are_picked_up() {
    let project = Project::empty();
    project.file(
        "barf.toml",
        r#"
        maxAutoSplits = 7
        testCommand = "cargo test"
        "#,
    );
    project.barf().args(["init"]).passes();
    project.barf().args(["new", "respects config"]).passes();

    project.barf().args(["status"]).passes().stdout_has("respects config");
}
