use chrono::Utc;
use tempfile::tempdir;

use barf_core::IssueId;

use super::*;

#[test]
fn append_then_read_all_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sessions.jsonl");
    let index = SessionIndex::new(&path);

    let event = SessionIndexEvent::Delete { issue_id: IssueId::new("001"), at: Utc::now() };
    index.append(&event);
    index.append(&event);

    let events = read_all(&path).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], event);
}

#[test]
fn read_all_on_missing_file_returns_empty() {
    let dir = tempdir().unwrap();
    let events = read_all(&dir.path().join("nope.jsonl")).unwrap();
    assert!(events.is_empty());
}

#[test]
fn append_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("sessions.jsonl");
    let index = SessionIndex::new(&path);
    index.append(&SessionIndexEvent::Delete { issue_id: IssueId::new("001"), at: Utc::now() });
    assert!(path.exists());
}
