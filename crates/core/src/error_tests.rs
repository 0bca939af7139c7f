use chrono::TimeZone;

use super::*;

#[test]
fn invalid_transition_message_names_both_states() {
    let err = Error::InvalidTransition { from: IssueState::New, to: IssueState::Verified };
    let message = err.to_string();
    assert!(message.contains("New"));
    assert!(message.contains("Verified"));
}

#[test]
fn rate_limit_without_reset_time_has_plain_message() {
    let err = Error::RateLimit { resets_at: None };
    assert_eq!(err.to_string(), "rate limited");
}

#[test]
fn rate_limit_with_reset_time_includes_it() {
    let at = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
    let err = Error::RateLimit { resets_at: Some(at) };
    assert!(err.to_string().contains("until"));
}

#[test]
fn io_error_converts_via_from() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::ProviderIo(_)));
}

#[test]
fn store_error_preserves_source() {
    let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    let err = Error::Store(Box::new(inner));
    assert!(std::error::Error::source(&err).is_some());
}
