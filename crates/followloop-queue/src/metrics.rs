//! Activity metrics derived from queue and history.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use followloop_protocols::UserRecord;

/// Follow activity summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMetrics {
    pub follows_24h: usize,
    pub unfollows_24h: usize,
    /// Follows minus unfollows over the last day.
    pub net_24h: i64,
    pub total_follows: usize,
    pub total_unfollows: usize,
    /// History records without an unfollow.
    pub active_follows: usize,
    pub queued: usize,
}

impl QueueMetrics {
    pub fn compute(queue: &[UserRecord], history: &[UserRecord], now: DateTime<Utc>) -> Self {
        let since = now - Duration::hours(24);
        let recent = |at: Option<DateTime<Utc>>| at.is_some_and(|t| t >= since && t <= now);

        let follows_24h = history.iter().filter(|r| recent(r.followed_at)).count();
        let unfollows_24h = history.iter().filter(|r| recent(r.unfollowed_at)).count();

        Self {
            follows_24h,
            unfollows_24h,
            net_24h: follows_24h as i64 - unfollows_24h as i64,
            total_follows: history.iter().filter(|r| r.followed_at.is_some()).count(),
            total_unfollows: history.iter().filter(|r| r.unfollowed_at.is_some()).count(),
            active_follows: history.iter().filter(|r| r.is_active_follow()).count(),
            queued: queue.len(),
        }
    }
}
