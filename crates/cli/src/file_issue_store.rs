// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed [`IssueStore`]: one Markdown file per issue under
//! `issuesDir`, TOML frontmatter for everything [`Issue`] tracks plus a
//! free-form Markdown body.

use std::path::PathBuf;

use async_trait::async_trait;
use barf_core::{Issue, IssueId, IssueState};
use barf_engine::{IssuePatch, IssueStore, IssueStoreError, Mode};

const FRONTMATTER_DELIM: &str = "+++\n";

pub struct FileIssueStore {
    issues_dir: PathBuf,
}

impl FileIssueStore {
    pub fn new(issues_dir: impl Into<PathBuf>) -> Self {
        Self { issues_dir: issues_dir.into() }
    }

    fn path(&self, id: &IssueId) -> PathBuf {
        self.issues_dir.join(format!("{}.md", id.as_str()))
    }

    async fn read_issue(&self, id: &IssueId) -> Result<Issue, IssueStoreError> {
        let raw = tokio::fs::read_to_string(self.path(id))
            .await
            .map_err(|err| map_read_err(id, err))?;
        parse_issue(&raw).ok_or_else(|| {
            IssueStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("malformed issue file for {id}"),
            ))
        })
    }

    async fn write_issue(&self, issue: &Issue) -> Result<(), IssueStoreError> {
        tokio::fs::create_dir_all(&self.issues_dir).await?;
        let rendered = render_issue(issue)
            .map_err(|err| IssueStoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err)))?;
        tokio::fs::write(self.path(&issue.id), rendered).await?;
        Ok(())
    }

    async fn next_id(&self) -> Result<IssueId, IssueStoreError> {
        let mut max = 0u32;
        let mut entries = match tokio::fs::read_dir(&self.issues_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(IssueId::new("001"));
            }
            Err(err) => return Err(IssueStoreError::Io(err)),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(n) = stem.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        Ok(IssueId::new(format!("{:03}", max + 1)))
    }
}

fn map_read_err(id: &IssueId, err: std::io::Error) -> IssueStoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IssueStoreError::NotFound(id.clone())
    } else {
        IssueStoreError::Io(err)
    }
}

/// `+++\n<toml>+++\n<body>` — everything `Issue` tracks lives in the
/// frontmatter table, with `body` spliced in from the trailing text so
/// the whole thing deserializes through `Issue`'s own `Deserialize` impl.
fn parse_issue(raw: &str) -> Option<Issue> {
    let rest = raw.strip_prefix(FRONTMATTER_DELIM)?;
    let (frontmatter, body) = rest.split_once(FRONTMATTER_DELIM)?;
    let mut value: toml::Value = toml::from_str(frontmatter).ok()?;
    value.as_table_mut()?.insert("body".to_string(), toml::Value::String(body.trim_start_matches('\n').to_string()));
    value.try_into().ok()
}

fn render_issue(issue: &Issue) -> Result<String, toml::ser::Error> {
    let mut value = toml::Value::try_from(issue).map_err(|err| err)?;
    let body = value
        .as_table_mut()
        .and_then(|table| table.remove("body"))
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let frontmatter = toml::to_string_pretty(&value)?;
    Ok(format!("{FRONTMATTER_DELIM}{frontmatter}{FRONTMATTER_DELIM}{body}"))
}

/// Naive acceptance-criteria check: an issue body with a
/// `## Acceptance Criteria` Markdown checklist passes once every item is
/// checked. An issue with no such section has nothing to gate on.
fn acceptance_criteria_met(body: &str) -> bool {
    let Some(section) = body.split("## Acceptance Criteria").nth(1) else { return true };
    let items: Vec<&str> = section
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("- [") )
        .take_while(|line| line.starts_with("- ["))
        .collect();
    if items.is_empty() {
        return true;
    }
    items.iter().all(|line| line.starts_with("- [x]") || line.starts_with("- [X]"))
}

#[async_trait]
impl IssueStore for FileIssueStore {
    async fn fetch(&self, id: &IssueId) -> Result<Issue, IssueStoreError> {
        self.read_issue(id).await
    }

    async fn write(&self, id: &IssueId, patch: IssuePatch) -> Result<(), IssueStoreError> {
        let mut issue = self.read_issue(id).await?;
        if let Some(v) = patch.force_split {
            issue.force_split = v;
        }
        if let Some(v) = patch.split_count {
            issue.split_count = v;
        }
        if let Some(v) = patch.context_usage_percent {
            issue.context_usage_percent = v;
        }
        if let Some(v) = patch.verify_count {
            issue.verify_count = v;
        }
        if let Some(v) = patch.verify_exhausted {
            issue.verify_exhausted = v;
        }
        if let Some(v) = patch.children {
            issue.children = v;
        }
        self.write_issue(&issue).await
    }

    async fn create_issue(
        &self,
        title: &str,
        body: Option<&str>,
        parent: Option<&IssueId>,
    ) -> Result<IssueId, IssueStoreError> {
        let id = self.next_id().await?;
        let mut issue = Issue::new(id.clone(), title, body.unwrap_or_default());
        issue.parent = parent.cloned();
        self.write_issue(&issue).await?;
        Ok(id)
    }

    async fn delete_issue(&self, id: &IssueId) -> Result<(), IssueStoreError> {
        match tokio::fs::remove_file(self.path(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(IssueStoreError::Io(err)),
        }
    }

    async fn list_issues(&self) -> Result<Vec<Issue>, IssueStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.issues_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(IssueStoreError::Io(err)),
        };
        let mut issues = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            if let Ok(raw) = tokio::fs::read_to_string(entry.path()).await {
                if let Some(issue) = parse_issue(&raw) {
                    issues.push(issue);
                }
            }
        }
        issues.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(issues)
    }

    async fn transition(&self, id: &IssueId, to: IssueState) -> Result<(), barf_core::Error> {
        let mut issue = self.read_issue(id).await.map_err(|err| barf_core::Error::Store(Box::new(err)))?;
        issue.transition(to)?;
        self.write_issue(&issue).await.map_err(|err| barf_core::Error::Store(Box::new(err)))?;
        Ok(())
    }

    async fn check_acceptance_criteria(&self, id: &IssueId) -> Result<bool, IssueStoreError> {
        let issue = self.read_issue(id).await?;
        Ok(acceptance_criteria_met(&issue.body))
    }

    async fn auto_select(&self, mode: Mode) -> Result<IssueId, IssueStoreError> {
        let want = match mode {
            Mode::Plan => IssueState::New,
            Mode::Build => IssueState::Planned,
        };
        self.list_issues()
            .await?
            .into_iter()
            .find(|issue| issue.state() == want)
            .map(|issue| issue.id)
            .ok_or(IssueStoreError::NoneAvailable)
    }

    async fn accumulate_stats(
        &self,
        id: &IssueId,
        input_tokens: u64,
        output_tokens: u64,
        duration_seconds: u64,
        iterations: u32,
    ) -> Result<(), IssueStoreError> {
        let mut issue = self.read_issue(id).await?;
        issue.accumulate_stats(input_tokens, output_tokens, duration_seconds, iterations);
        self.write_issue(&issue).await
    }
}

#[cfg(test)]
#[path = "file_issue_store_tests.rs"]
mod tests;
