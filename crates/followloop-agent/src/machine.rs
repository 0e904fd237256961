//! Pure transition functions of the follow agent.
//!
//! Nothing here touches the store, the page or a timer; the async
//! [`FollowAgent`](crate::FollowAgent) feeds these functions fresh reads and
//! acts on their answers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use followloop_protocols::{FollowStatus, RunState, Settings, UserRecord, same_username};
use followloop_queue::model;

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;

/// Lifecycle phase of the agent hosted in one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// Not running, or running on behalf of another page.
    #[default]
    Idle,
    /// Running, but this page is not the target.
    AwaitingTarget,
    /// This page is the target; guards not yet evaluated.
    OnTargetPage,
    /// Acting on the target.
    Processing,
    /// Waiting out the inter-action delay before navigating.
    Navigating,
    /// The run ended on this page.
    Stopped,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Idle => "idle",
            AgentPhase::AwaitingTarget => "awaiting_target",
            AgentPhase::OnTargetPage => "on_target_page",
            AgentPhase::Processing => "processing",
            AgentPhase::Navigating => "navigating",
            AgentPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What a freshly loaded page should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDecision {
    /// The agent is not running.
    Idle,
    /// Another page holds the run lease.
    NotOwner { owner: String },
    /// Running without a target.
    NoTarget,
    /// The page shows someone other than the target.
    Mismatch {
        expected: String,
        found: Option<String>,
    },
    /// The page is the target's profile.
    Process(String),
}

impl LoadDecision {
    pub fn phase(&self) -> AgentPhase {
        match self {
            LoadDecision::Idle | LoadDecision::NotOwner { .. } => AgentPhase::Idle,
            LoadDecision::NoTarget | LoadDecision::Mismatch { .. } => AgentPhase::AwaitingTarget,
            LoadDecision::Process(_) => AgentPhase::OnTargetPage,
        }
    }
}

/// Decide the page-load transition from the persisted run state.
///
/// `profile` is the handle addressed by the page, if any.
pub fn decide_on_load(state: &RunState, page_id: &str, profile: Option<&str>) -> LoadDecision {
    if !state.is_running {
        return LoadDecision::Idle;
    }
    if !state.is_owned_by(page_id) {
        return LoadDecision::NotOwner {
            owner: state.owner.clone().unwrap_or_default(),
        };
    }
    let Some(target) = state.current_user.as_deref() else {
        return LoadDecision::NoTarget;
    };
    match profile {
        Some(found) if same_username(found, target) => LoadDecision::Process(target.to_string()),
        found => LoadDecision::Mismatch {
            expected: target.to_string(),
            found: found.map(str::to_string),
        },
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    DailyLimit { count: u32, limit: u32 },
    HourlyLimit { count: u32, limit: u32 },
    SessionLimit { count: u32, limit: u32 },
    TooManyErrors { count: u32 },
    /// Nothing left to follow or check.
    Exhausted,
    /// An unexpected error inside a processing step.
    Fatal { message: String },
}

impl StopReason {
    /// Entry written to the error log when the run halts, if any.
    pub fn log_message(&self) -> Option<String> {
        match self {
            StopReason::TooManyErrors { .. } => {
                Some("Agent paused due to too many consecutive errors".to_string())
            }
            StopReason::Fatal { message } => Some(format!("Critical error: {}", message)),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::DailyLimit { limit, .. } => write!(f, "Daily follow limit reached ({})", limit),
            StopReason::HourlyLimit { limit, .. } => write!(f, "Hourly follow limit reached ({})", limit),
            StopReason::SessionLimit { limit, .. } => {
                write!(f, "Max actions per session reached ({})", limit)
            }
            StopReason::TooManyErrors { count } => {
                write!(f, "Too many errors in a row ({}), pausing agent", count)
            }
            StopReason::Exhausted => write!(f, "Agent finished processing"),
            StopReason::Fatal { message } => write!(f, "Critical error: {}", message),
        }
    }
}

/// Evaluate the stop conditions in order. `state` must already be rolled over.
pub fn check_guards(
    state: &RunState,
    settings: &Settings,
    now: DateTime<Utc>,
    max_consecutive_errors: u32,
) -> Option<StopReason> {
    let daily = state.follows_today(now);
    if daily >= settings.daily_follow_limit {
        return Some(StopReason::DailyLimit {
            count: daily,
            limit: settings.daily_follow_limit,
        });
    }

    let hourly = state.current_hour(now).follow_count;
    if settings.hourly_follow_limit > 0 && hourly >= settings.hourly_follow_limit {
        return Some(StopReason::HourlyLimit {
            count: hourly,
            limit: settings.hourly_follow_limit,
        });
    }

    if settings.max_actions_session > 0 && state.session_action_count >= settings.max_actions_session {
        return Some(StopReason::SessionLimit {
            count: state.session_action_count,
            limit: settings.max_actions_session,
        });
    }

    check_breaker(state, max_consecutive_errors)
}

/// Trips once `max_consecutive_errors` action failures have happened in a row.
pub fn check_breaker(state: &RunState, max_consecutive_errors: u32) -> Option<StopReason> {
    (state.consecutive_errors >= max_consecutive_errors).then_some(StopReason::TooManyErrors {
        count: state.consecutive_errors,
    })
}

/// Step to take on the target's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPlan {
    Follow,
    Unfollow,
    /// Already followed and not due: drop from the queue.
    Dequeue,
    /// History says followed, the page says otherwise.
    ExternallyUnfollowed,
    /// Nothing enabled applies.
    Pass,
}

/// Pick the action for `username` given its observed follow status.
pub fn plan_action(
    status: FollowStatus,
    username: &str,
    queue: &[UserRecord],
    history: &[UserRecord],
    settings: &Settings,
    now: DateTime<Utc>,
) -> ActionPlan {
    let record = history.iter().find(|r| r.matches(username));

    if status.following {
        let due = settings.enable_auto_unfollow
            && record.is_some_and(|r| {
                model::is_unfollow_due(r, settings.unfollow_threshold_secs(), now)
            });
        return if due { ActionPlan::Unfollow } else { ActionPlan::Dequeue };
    }

    let queued = queue.iter().any(|r| r.matches(username));
    if !status.unsure && !queued && record.is_some_and(UserRecord::is_active_follow) {
        return ActionPlan::ExternallyUnfollowed;
    }

    if settings.enable_auto_follow {
        ActionPlan::Follow
    } else {
        ActionPlan::Pass
    }
}

/// The next profile to visit and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTarget {
    Follow(String),
    Unfollow(String),
}

impl NextTarget {
    pub fn username(&self) -> &str {
        match self {
            NextTarget::Follow(name) | NextTarget::Unfollow(name) => name,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            NextTarget::Follow(_) => "follow",
            NextTarget::Unfollow(_) => "unfollow check",
        }
    }
}

/// Follow candidates first while the daily limit allows, then unfollow checks.
pub fn select_next_target(
    queue: &[UserRecord],
    history: &[UserRecord],
    settings: &Settings,
    state: &RunState,
    now: DateTime<Utc>,
) -> Option<NextTarget> {
    if settings.enable_auto_follow && state.follows_today(now) < settings.daily_follow_limit {
        if let Some(record) = model::next_follow_candidate(queue, history) {
            return Some(NextTarget::Follow(record.username.clone()));
        }
    }

    if settings.enable_auto_unfollow {
        let threshold = settings.unfollow_threshold_secs();
        if let Some(record) = model::next_unfollow_candidate(history, threshold, now) {
            return Some(NextTarget::Unfollow(record.username.clone()));
        }
    }

    None
}

/// First path segments that are site sections rather than profiles.
const RESERVED_PATHS: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "search",
    "settings",
    "compose",
    "i",
    "login",
    "logout",
];

/// Whether `host` is one of `allowed` or a subdomain of one.
pub fn is_allowed_host(host: &str, allowed: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    allowed.iter().any(|a| {
        let a = a.to_ascii_lowercase();
        host == a || host.ends_with(&format!(".{}", a))
    })
}

/// Handle addressed by a profile URL on an allowed host.
pub fn profile_from_url(url: &str, allowed_hosts: &[String]) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !is_allowed_host(parsed.host_str()?, allowed_hosts) {
        return None;
    }
    let segment = parsed.path_segments()?.next()?;
    if segment.is_empty() || RESERVED_PATHS.contains(&segment.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(segment.to_string())
}
