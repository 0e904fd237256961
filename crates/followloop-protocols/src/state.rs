//! Persisted control-loop state, stored under `agentState`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

/// Per-day action counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// Day key, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub follow_count: u32,
    #[serde(default)]
    pub unfollow_count: u32,
}

/// Per-hour action counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyCounts {
    #[serde(default)]
    pub follow_count: u32,
    #[serde(default)]
    pub unfollow_count: u32,
}

/// One entry of the bounded error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Username or operation the error relates to.
    pub context: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Control-loop state shared by every execution context through the store.
///
/// `current_user` is only ever set while `is_running` is true; [`RunState::stop`]
/// clears both together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    #[serde(default)]
    pub is_running: bool,

    #[serde(default)]
    pub current_user: Option<String>,

    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,

    /// Lifetime follow total.
    #[serde(default)]
    pub follow_count: u64,

    #[serde(default)]
    pub session_action_count: u32,

    #[serde(default)]
    pub consecutive_errors: u32,

    #[serde(default)]
    pub daily_stats: DailyStats,

    /// Only the current hour's bucket is retained.
    #[serde(default)]
    pub hourly_stats: BTreeMap<String, HourlyCounts>,

    #[serde(default)]
    pub errors: Vec<ErrorEntry>,

    /// Page that holds the run lease.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Day bucket key for `now`.
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Hour bucket key for `now`.
pub fn hour_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H").to_string()
}

impl RunState {
    /// Reset counters whose day or hour has passed.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = day_key(now);
        if self.daily_stats.date != today {
            self.daily_stats = DailyStats {
                date: today,
                ..Default::default()
            };
        }

        let hour = hour_key(now);
        if !self.hourly_stats.contains_key(&hour) {
            self.hourly_stats.clear();
            self.hourly_stats.insert(hour, HourlyCounts::default());
        }
    }

    /// Counters of the current hour (zero when the bucket is stale or missing).
    pub fn current_hour(&self, now: DateTime<Utc>) -> HourlyCounts {
        self.hourly_stats
            .get(&hour_key(now))
            .copied()
            .unwrap_or_default()
    }

    /// Follow count of today (zero when the daily bucket is stale).
    pub fn follows_today(&self, now: DateTime<Utc>) -> u32 {
        if self.daily_stats.date == day_key(now) {
            self.daily_stats.follow_count
        } else {
            0
        }
    }

    /// Enter the running state for a new session.
    pub fn begin(&mut self, now: DateTime<Utc>, owner: impl Into<String>, target: Option<String>) {
        self.roll_over(now);
        self.is_running = true;
        self.last_run = Some(now);
        self.session_action_count = 0;
        self.consecutive_errors = 0;
        self.owner = Some(owner.into());
        self.current_user = target;
    }

    /// Leave the running state. Always clears the target and lease.
    pub fn stop(&mut self) {
        self.is_running = false;
        self.current_user = None;
        self.owner = None;
        self.consecutive_errors = 0;
    }

    /// Whether `page` may drive this run.
    pub fn is_owned_by(&self, page: &str) -> bool {
        self.owner.as_deref().is_none_or(|owner| owner == page)
    }

    /// Count a verified follow.
    pub fn record_follow(&mut self, now: DateTime<Utc>) {
        self.roll_over(now);
        self.follow_count += 1;
        self.session_action_count += 1;
        self.daily_stats.follow_count += 1;
        self.hourly_stats.entry(hour_key(now)).or_default().follow_count += 1;
        self.consecutive_errors = 0;
    }

    /// Count a verified unfollow.
    pub fn record_unfollow(&mut self, now: DateTime<Utc>) {
        self.roll_over(now);
        self.session_action_count += 1;
        self.daily_stats.unfollow_count += 1;
        self.hourly_stats.entry(hour_key(now)).or_default().unfollow_count += 1;
        self.consecutive_errors = 0;
    }

    /// A step finished without a failure.
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Log an action failure and bump the consecutive-error counter.
    pub fn record_failure(
        &mut self,
        context: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
        limit: usize,
    ) {
        self.consecutive_errors += 1;
        self.log_error(context, message, now, limit);
    }

    /// Append to the error log, dropping the oldest entries beyond `limit`.
    pub fn log_error(
        &mut self,
        context: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
        limit: usize,
    ) {
        self.errors.push(ErrorEntry {
            context: context.into(),
            message: message.into(),
            time: now,
        });
        if self.errors.len() > limit {
            let excess = self.errors.len() - limit;
            self.errors.drain(..excess);
        }
    }

    /// Most recent error, if any.
    pub fn last_error(&self) -> Option<&ErrorEntry> {
        self.errors.last()
    }
}
