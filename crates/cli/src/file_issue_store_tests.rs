use barf_engine::IssuePatch;
use tempfile::tempdir;

use super::*;

#[tokio::test]
async fn create_then_fetch_round_trips_through_frontmatter() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());

    let id = store.create_issue("add retry logic", Some("body text"), None).await.unwrap();
    let issue = store.fetch(&id).await.unwrap();

    assert_eq!(issue.title, "add retry logic");
    assert_eq!(issue.body, "body text");
    assert_eq!(issue.state(), IssueState::New);
}

#[tokio::test]
async fn sequential_ids_are_zero_padded_and_increasing() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());

    let first = store.create_issue("a", None, None).await.unwrap();
    let second = store.create_issue("b", None, None).await.unwrap();

    assert_eq!(first.as_str(), "001");
    assert_eq!(second.as_str(), "002");
}

#[tokio::test]
async fn write_patch_applies_only_the_fields_that_are_some() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    let id = store.create_issue("x", None, None).await.unwrap();

    store
        .write(&id, IssuePatch { split_count: Some(2), force_split: Some(true), ..Default::default() })
        .await
        .unwrap();

    let issue = store.fetch(&id).await.unwrap();
    assert_eq!(issue.split_count, 2);
    assert!(issue.force_split);
    assert_eq!(issue.verify_count, 0);
}

#[tokio::test]
async fn transition_rejects_illegal_edges_and_persists_legal_ones() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    let id = store.create_issue("x", None, None).await.unwrap();

    assert!(store.transition(&id, IssueState::Planned).await.is_ok());
    let issue = store.fetch(&id).await.unwrap();
    assert_eq!(issue.state(), IssueState::Planned);

    assert!(store.transition(&id, IssueState::Verified).await.is_err());
    let issue = store.fetch(&id).await.unwrap();
    assert_eq!(issue.state(), IssueState::Planned);
}

#[tokio::test]
async fn auto_select_picks_the_first_issue_in_the_wanted_state() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    let planned = store.create_issue("planned one", None, None).await.unwrap();
    store.transition(&planned, IssueState::Planned).await.unwrap();
    let _new_one = store.create_issue("still new", None, None).await.unwrap();

    let selected = store.auto_select(Mode::Build).await.unwrap();
    assert_eq!(selected, planned);
}

#[tokio::test]
async fn auto_select_reports_none_available_when_nothing_matches() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    store.create_issue("new issue", None, None).await.unwrap();

    let err = store.auto_select(Mode::Build).await.unwrap_err();
    assert!(matches!(err, IssueStoreError::NoneAvailable));
}

#[test]
fn acceptance_criteria_with_unchecked_items_is_not_met() {
    let body = "## Acceptance Criteria\n- [x] first\n- [ ] second\n";
    assert!(!acceptance_criteria_met(body));
}

#[test]
fn acceptance_criteria_all_checked_is_met() {
    let body = "## Acceptance Criteria\n- [x] first\n- [x] second\n";
    assert!(acceptance_criteria_met(body));
}

#[test]
fn body_with_no_acceptance_criteria_section_has_nothing_to_gate_on() {
    assert!(acceptance_criteria_met("just a plain description, no checklist"));
}

#[tokio::test]
async fn accumulate_stats_adds_onto_existing_totals() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    let id = store.create_issue("x", None, None).await.unwrap();

    store.accumulate_stats(&id, 100, 50, 10, 1).await.unwrap();
    store.accumulate_stats(&id, 20, 5, 2, 1).await.unwrap();

    let issue = store.fetch(&id).await.unwrap();
    assert_eq!(issue.total_input_tokens, 120);
    assert_eq!(issue.total_output_tokens, 55);
    assert_eq!(issue.total_iterations, 2);
    assert_eq!(issue.run_count, 2);
}

#[tokio::test]
async fn fetch_of_missing_issue_is_not_found() {
    let dir = tempdir().unwrap();
    let store = FileIssueStore::new(dir.path());
    let err = store.fetch(&IssueId::new("999")).await.unwrap_err();
    assert!(matches!(err, IssueStoreError::NotFound(_)));
}
