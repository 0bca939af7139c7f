use barf_core::SystemClock;
use tempfile::tempdir;

use super::*;

fn issue_id() -> IssueId {
    IssueId::new("001")
}

#[test]
fn acquire_on_empty_dir_succeeds() {
    let dir = tempdir().unwrap();
    let lock = Lock::new(dir.path());
    let clock = SystemClock;
    let outcome = lock
        .acquire(&issue_id(), LockMode::Build, IssueState::InProgress, std::process::id(), &clock)
        .unwrap();
    assert!(outcome.acquired());
    assert!(dir.path().join("001.lock").exists());
}

#[test]
fn second_acquire_by_live_process_is_busy() {
    let dir = tempdir().unwrap();
    let lock = Lock::new(dir.path());
    let clock = SystemClock;
    let pid = std::process::id();
    lock.acquire(&issue_id(), LockMode::Build, IssueState::InProgress, pid, &clock).unwrap();

    let outcome = lock.acquire(&issue_id(), LockMode::Build, IssueState::InProgress, pid, &clock).unwrap();
    match outcome {
        AcquireOutcome::Busy(info) => assert_eq!(info.pid, pid),
        other => panic!("expected Busy, got {other:?}"),
    }
}

#[test]
fn acquire_reclaims_a_lock_held_by_a_dead_pid() {
    let dir = tempdir().unwrap();
    let lock = Lock::new(dir.path());
    let clock = SystemClock;
    // PID 1 is never the caller's own process in this sandbox, and a
    // freshly invented high PID is very unlikely to be alive; use a
    // value guaranteed dead instead of guessing at the live range.
    let dead_pid = 999_999;
    lock.acquire(&issue_id(), LockMode::Build, IssueState::InProgress, dead_pid, &clock).unwrap();

    let outcome = lock
        .acquire(&issue_id(), LockMode::Build, IssueState::InProgress, std::process::id(), &clock)
        .unwrap();
    match outcome {
        AcquireOutcome::StaleReclaimed(info) => assert_eq!(info.pid, dead_pid),
        other => panic!("expected StaleReclaimed, got {other:?}"),
    }
}

#[test]
fn release_on_absent_lock_is_not_an_error() {
    let dir = tempdir().unwrap();
    let lock = Lock::new(dir.path());
    lock.release(&issue_id()).unwrap();
}

#[test]
fn release_then_acquire_succeeds_immediately() {
    let dir = tempdir().unwrap();
    let lock = Lock::new(dir.path());
    let clock = SystemClock;
    let pid = std::process::id();
    lock.acquire(&issue_id(), LockMode::Plan, IssueState::New, pid, &clock).unwrap();
    lock.release(&issue_id()).unwrap();
    let outcome = lock.acquire(&issue_id(), LockMode::Plan, IssueState::New, pid, &clock).unwrap();
    assert!(outcome.acquired());
}
