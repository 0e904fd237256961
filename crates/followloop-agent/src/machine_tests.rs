use super::*;
use chrono::{Duration, TimeZone};
use followloop_protocols::state::hour_key;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 30, 0).unwrap()
}

fn running(target: Option<&str>) -> RunState {
    let mut state = RunState::default();
    state.begin(now(), "tab-1", target.map(str::to_string));
    state
}

fn followed(username: &str, secs_ago: i64) -> UserRecord {
    let mut record = UserRecord::new(username);
    record.mark_followed(now() - Duration::seconds(secs_ago));
    record
}

fn hosts() -> Vec<String> {
    vec!["x.com".to_string(), "twitter.com".to_string()]
}

#[test]
fn test_load_idle_when_not_running() {
    let state = RunState::default();
    assert_eq!(decide_on_load(&state, "tab-1", Some("alice")), LoadDecision::Idle);
    assert_eq!(LoadDecision::Idle.phase(), AgentPhase::Idle);
}

#[test]
fn test_load_matches_case_insensitively() {
    let state = running(Some("Alice"));
    let decision = decide_on_load(&state, "tab-1", Some("alice"));
    assert_eq!(decision, LoadDecision::Process("Alice".into()));
    assert_eq!(decision.phase(), AgentPhase::OnTargetPage);
}

#[test]
fn test_load_mismatch_waits() {
    let state = running(Some("alice"));
    let decision = decide_on_load(&state, "tab-1", Some("bob"));
    assert_eq!(
        decision,
        LoadDecision::Mismatch {
            expected: "alice".into(),
            found: Some("bob".into())
        }
    );
    assert_eq!(decision.phase(), AgentPhase::AwaitingTarget);
}

#[test]
fn test_load_respects_lease() {
    let state = running(Some("alice"));
    assert_eq!(
        decide_on_load(&state, "tab-2", Some("alice")),
        LoadDecision::NotOwner {
            owner: "tab-1".into()
        }
    );
}

#[test]
fn test_load_without_target() {
    let state = running(None);
    assert_eq!(decide_on_load(&state, "tab-1", Some("alice")), LoadDecision::NoTarget);
}

#[test]
fn test_guard_daily_limit_first() {
    let mut state = running(Some("alice"));
    state.daily_stats.follow_count = 50;
    state.consecutive_errors = 9;
    let reason = check_guards(&state, &Settings::default(), now(), 5);
    assert_eq!(reason, Some(StopReason::DailyLimit { count: 50, limit: 50 }));
}

#[test]
fn test_guard_hourly_limit_only_when_enabled() {
    let mut state = running(Some("alice"));
    state.hourly_stats.get_mut(&hour_key(now())).unwrap().follow_count = 3;

    assert_eq!(check_guards(&state, &Settings::default(), now(), 5), None);

    let settings = Settings {
        hourly_follow_limit: 3,
        ..Default::default()
    };
    assert_eq!(
        check_guards(&state, &settings, now(), 5),
        Some(StopReason::HourlyLimit { count: 3, limit: 3 })
    );
}

#[test]
fn test_guard_session_limit() {
    let mut state = running(Some("alice"));
    state.session_action_count = 10;
    let settings = Settings {
        max_actions_session: 10,
        ..Default::default()
    };
    assert!(matches!(
        check_guards(&state, &settings, now(), 5),
        Some(StopReason::SessionLimit { .. })
    ));
}

#[test]
fn test_guard_circuit_breaker() {
    let mut state = running(Some("alice"));
    state.consecutive_errors = 4;
    assert_eq!(check_guards(&state, &Settings::default(), now(), 5), None);
    state.consecutive_errors = 5;
    let reason = check_guards(&state, &Settings::default(), now(), 5).unwrap();
    assert_eq!(reason, StopReason::TooManyErrors { count: 5 });
    assert!(reason.log_message().is_some());
}

#[test]
fn test_plan_follow_when_not_following() {
    let queue = vec![UserRecord::new("alice")];
    let plan = plan_action(
        FollowStatus::default(),
        "alice",
        &queue,
        &[],
        &Settings::default(),
        now(),
    );
    assert_eq!(plan, ActionPlan::Follow);
}

#[test]
fn test_plan_dequeue_when_already_following() {
    let status = FollowStatus {
        following: true,
        ..Default::default()
    };
    let queue = vec![UserRecord::new("alice")];
    assert_eq!(
        plan_action(status, "alice", &queue, &[], &Settings::default(), now()),
        ActionPlan::Dequeue
    );
}

#[test]
fn test_plan_unfollow_when_due() {
    let status = FollowStatus {
        following: true,
        ..Default::default()
    };
    let history = vec![followed("bob", 61)];
    let settings = Settings {
        enable_auto_unfollow: true,
        unfollow_seconds: Some(60),
        ..Default::default()
    };
    assert_eq!(
        plan_action(status, "bob", &[], &history, &settings, now()),
        ActionPlan::Unfollow
    );

    let early = vec![followed("bob", 30)];
    assert_eq!(
        plan_action(status, "bob", &[], &early, &settings, now()),
        ActionPlan::Dequeue
    );
}

#[test]
fn test_plan_externally_unfollowed() {
    let history = vec![followed("dave", 100)];
    assert_eq!(
        plan_action(FollowStatus::default(), "dave", &[], &history, &Settings::default(), now()),
        ActionPlan::ExternallyUnfollowed
    );

    // An unsure reading is not evidence of an external unfollow.
    let unsure = FollowStatus {
        unsure: true,
        ..Default::default()
    };
    assert_eq!(
        plan_action(unsure, "dave", &[], &history, &Settings::default(), now()),
        ActionPlan::Follow
    );
}

#[test]
fn test_plan_pass_when_follow_disabled() {
    let settings = Settings {
        enable_auto_follow: false,
        enable_auto_unfollow: true,
        ..Default::default()
    };
    let queue = vec![UserRecord::new("alice")];
    assert_eq!(
        plan_action(FollowStatus::default(), "alice", &queue, &[], &settings, now()),
        ActionPlan::Pass
    );
}

#[test]
fn test_next_target_prefers_follow_queue() {
    let queue = vec![UserRecord::new("alice"), UserRecord::new("carol")];
    let history = vec![followed("bob", 1000)];
    let settings = Settings {
        enable_auto_unfollow: true,
        ..Default::default()
    };
    let state = running(None);
    assert_eq!(
        select_next_target(&queue, &history, &settings, &state, now()),
        Some(NextTarget::Follow("alice".into()))
    );
}

#[test]
fn test_next_target_unfollow_after_daily_limit() {
    let queue = vec![UserRecord::new("alice")];
    let history = vec![followed("bob", 1000)];
    let settings = Settings {
        enable_auto_unfollow: true,
        daily_follow_limit: 1,
        ..Default::default()
    };
    let mut state = running(None);
    state.daily_stats.follow_count = 1;
    let next = select_next_target(&queue, &history, &settings, &state, now()).unwrap();
    assert_eq!(next, NextTarget::Unfollow("bob".into()));
    assert_eq!(next.action(), "unfollow check");
}

#[test]
fn test_next_target_none_when_exhausted() {
    let state = running(None);
    assert_eq!(
        select_next_target(&[], &[], &Settings::default(), &state, now()),
        None
    );
}

#[test]
fn test_profile_from_url() {
    assert_eq!(
        profile_from_url("https://x.com/alice", &hosts()),
        Some("alice".into())
    );
    assert_eq!(
        profile_from_url("https://mobile.twitter.com/Bob/with_replies", &hosts()),
        Some("Bob".into())
    );
    assert_eq!(profile_from_url("https://x.com/home", &hosts()), None);
    assert_eq!(profile_from_url("https://x.com/", &hosts()), None);
    assert_eq!(profile_from_url("https://example.com/alice", &hosts()), None);
    assert_eq!(profile_from_url("not a url", &hosts()), None);
}

#[test]
fn test_allowed_host_suffix() {
    assert!(is_allowed_host("x.com", &hosts()));
    assert!(is_allowed_host("WWW.X.COM", &hosts()));
    assert!(!is_allowed_host("notx.com", &hosts()));
}
