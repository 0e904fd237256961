use super::*;
use chrono::{Duration, TimeZone};

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 15, 0).unwrap()
}

#[test]
fn test_bucket_keys() {
    assert_eq!(day_key(noon()), "2026-03-01");
    assert_eq!(hour_key(noon()), "2026-03-01T12");
}

#[test]
fn test_roll_over_resets_daily_on_new_date() {
    let mut state = RunState::default();
    state.roll_over(noon());
    state.record_follow(noon());
    assert_eq!(state.daily_stats.follow_count, 1);

    let tomorrow = noon() + Duration::days(1);
    state.roll_over(tomorrow);
    assert_eq!(state.daily_stats.date, "2026-03-02");
    assert_eq!(state.daily_stats.follow_count, 0);
    assert_eq!(state.follow_count, 1);
}

#[test]
fn test_roll_over_keeps_only_current_hour() {
    let mut state = RunState::default();
    state.record_follow(noon());
    state.record_follow(noon() + Duration::hours(1));
    assert_eq!(state.hourly_stats.len(), 1);
    assert_eq!(state.current_hour(noon() + Duration::hours(1)).follow_count, 1);
    assert_eq!(state.current_hour(noon()).follow_count, 0);
    assert_eq!(state.daily_stats.follow_count, 2);
}

#[test]
fn test_begin_and_stop() {
    let mut state = RunState::default();
    state.session_action_count = 9;
    state.consecutive_errors = 3;
    state.begin(noon(), "tab-1", Some("alice".into()));
    assert!(state.is_running);
    assert_eq!(state.current_user.as_deref(), Some("alice"));
    assert_eq!(state.session_action_count, 0);
    assert_eq!(state.consecutive_errors, 0);
    assert!(state.is_owned_by("tab-1"));
    assert!(!state.is_owned_by("tab-2"));

    state.stop();
    assert!(!state.is_running);
    assert!(state.current_user.is_none());
    assert!(state.is_owned_by("tab-2"));
}

#[test]
fn test_failure_counter_and_bounded_log() {
    let mut state = RunState::default();
    for i in 0..7 {
        state.record_failure(format!("user{}", i), "not verified", noon(), 5);
    }
    assert_eq!(state.consecutive_errors, 7);
    assert_eq!(state.errors.len(), 5);
    assert_eq!(state.errors[0].context, "user2");
    assert_eq!(state.last_error().map(|e| e.context.as_str()), Some("user6"));

    state.record_unfollow(noon());
    assert_eq!(state.consecutive_errors, 0);
    assert_eq!(state.daily_stats.unfollow_count, 1);
    assert_eq!(state.session_action_count, 1);
}

#[test]
fn test_follows_today_ignores_stale_bucket() {
    let mut state = RunState::default();
    state.record_follow(noon());
    assert_eq!(state.follows_today(noon()), 1);
    assert_eq!(state.follows_today(noon() + Duration::days(1)), 0);
}

#[test]
fn test_state_wire_format() {
    let json = r#"{"isRunning":true,"currentUser":"alice","dailyStats":{"date":"2026-03-01","followCount":4}}"#;
    let state: RunState = serde_json::from_str(json).unwrap();
    assert!(state.is_running);
    assert_eq!(state.daily_stats.follow_count, 4);
    assert_eq!(state.daily_stats.unfollow_count, 0);
    assert!(state.errors.is_empty());

    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["sessionActionCount"], 0);
    assert!(value.get("owner").is_none());
}
