//! Pure queue and history operations.
//!
//! Queue entries are unique by username (case-insensitive) and keep insertion
//! order. History only ever gains records or has `unfollowed_at` set.

use chrono::{DateTime, Utc};

use followloop_protocols::UserRecord;

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;

/// A history record counts as "close" to the unfollow threshold at this fraction.
pub const CLOSE_TO_THRESHOLD: f64 = 0.8;

fn contains(list: &[UserRecord], username: &str) -> bool {
    list.iter().any(|r| r.matches(username))
}

/// Append every record absent from both `queue` and `history`.
///
/// Returns the number inserted. Running twice with the same input inserts
/// nothing the second time.
pub fn enqueue_if_new<I>(queue: &mut Vec<UserRecord>, history: &[UserRecord], records: I) -> usize
where
    I: IntoIterator<Item = UserRecord>,
{
    let mut inserted = 0;
    for record in records {
        if contains(queue, &record.username) || contains(history, &record.username) {
            continue;
        }
        queue.push(record);
        inserted += 1;
    }
    inserted
}

/// Record a follow of `username` at `now` and drop it from the queue.
///
/// Descriptive fields are carried over from the queued record when present.
pub fn mark_followed(
    queue: &mut Vec<UserRecord>,
    history: &mut Vec<UserRecord>,
    username: &str,
    now: DateTime<Utc>,
) {
    let queued = queue
        .iter()
        .position(|r| r.matches(username))
        .map(|idx| queue.remove(idx));

    if let Some(existing) = history.iter_mut().find(|r| r.matches(username)) {
        existing.mark_followed(now);
        return;
    }

    let mut record = queued.unwrap_or_else(|| UserRecord::new(username));
    record.mark_followed(now);
    history.push(record);
}

/// Set `unfollowed_at` on the matching history record.
///
/// Returns false when no followed record exists.
pub fn mark_unfollowed(history: &mut [UserRecord], username: &str, now: DateTime<Utc>) -> bool {
    history
        .iter_mut()
        .find(|r| r.matches(username))
        .is_some_and(|r| r.mark_unfollowed(now))
}

/// Remove `username` from the queue. Returns whether it was present.
pub fn remove_queued(queue: &mut Vec<UserRecord>, username: &str) -> bool {
    let before = queue.len();
    queue.retain(|r| !r.matches(username));
    queue.len() != before
}

/// First queue entry not already in history.
pub fn next_follow_candidate<'a>(
    queue: &'a [UserRecord],
    history: &[UserRecord],
) -> Option<&'a UserRecord> {
    queue.iter().find(|r| !contains(history, &r.username))
}

/// Oldest active follow that is due, or closest to due, for an unfollow.
///
/// Prefers the oldest record whose elapsed time reaches
/// [`CLOSE_TO_THRESHOLD`] of `threshold_secs`, falling back to the oldest
/// active follow. `None` when no threshold applies or nothing is active.
pub fn next_unfollow_candidate(
    history: &[UserRecord],
    threshold_secs: Option<u64>,
    now: DateTime<Utc>,
) -> Option<&UserRecord> {
    let threshold = threshold_secs?;

    let mut active: Vec<&UserRecord> = history.iter().filter(|r| r.is_active_follow()).collect();
    active.sort_by_key(|r| r.followed_at);

    let close = threshold as f64 * CLOSE_TO_THRESHOLD;
    active
        .iter()
        .find(|r| {
            r.seconds_since_follow(now)
                .is_some_and(|elapsed| elapsed as f64 >= close)
        })
        .or_else(|| active.first())
        .copied()
}

/// Whether `record` has been followed for at least `threshold_secs`.
pub fn is_unfollow_due(record: &UserRecord, threshold_secs: Option<u64>, now: DateTime<Utc>) -> bool {
    match (threshold_secs, record.seconds_since_follow(now)) {
        (Some(threshold), Some(elapsed)) => record.is_active_follow() && elapsed >= threshold as i64,
        _ => false,
    }
}
