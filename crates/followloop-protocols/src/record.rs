//! User records tracked through the follow lifecycle.
//!
//! A record's lifecycle stage is encoded by which timestamps are present;
//! [`UserRecord::status`] derives it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

/// Maximum handle length accepted by the target site.
pub const MAX_USERNAME_LEN: usize = 15;

/// Lifecycle stage derived from a record's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Extracted, not yet followed.
    Queued,
    /// Followed and still active.
    Followed,
    /// Followed, later unfollowed.
    Unfollowed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Queued => write!(f, "queued"),
            RecordStatus::Followed => write!(f, "followed"),
            RecordStatus::Unfollowed => write!(f, "unfollowed"),
        }
    }
}

/// A single account moving through queue and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Account handle, unique case-insensitively.
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,

    #[serde(default)]
    pub extracted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub followed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub unfollowed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Create a bare queued record.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            profile_url: None,
            extracted_at: None,
            followed_at: None,
            unfollowed_at: None,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the profile URL.
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    /// Stamp the extraction time.
    pub fn extracted(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = Some(at);
        self
    }

    /// Derived lifecycle stage.
    pub fn status(&self) -> RecordStatus {
        if self.unfollowed_at.is_some() {
            RecordStatus::Unfollowed
        } else if self.followed_at.is_some() {
            RecordStatus::Followed
        } else {
            RecordStatus::Queued
        }
    }

    /// `unfollowed_at` may only be present alongside `followed_at`.
    pub fn is_consistent(&self) -> bool {
        self.unfollowed_at.is_none() || self.followed_at.is_some()
    }

    /// Case-insensitive handle comparison.
    pub fn matches(&self, username: &str) -> bool {
        same_username(&self.username, username)
    }

    /// Still followed (no unfollow recorded).
    pub fn is_active_follow(&self) -> bool {
        self.followed_at.is_some() && self.unfollowed_at.is_none()
    }

    /// Seconds elapsed since the follow, if followed.
    pub fn seconds_since_follow(&self, now: DateTime<Utc>) -> Option<i64> {
        self.followed_at.map(|at| (now - at).num_seconds())
    }

    /// Record a follow at `at`, clearing any earlier unfollow.
    pub fn mark_followed(&mut self, at: DateTime<Utc>) {
        self.followed_at = Some(at);
        self.unfollowed_at = None;
    }

    /// Record an unfollow. Returns false when the record was never followed.
    pub fn mark_unfollowed(&mut self, at: DateTime<Utc>) -> bool {
        if self.followed_at.is_none() {
            return false;
        }
        self.unfollowed_at = Some(at);
        true
    }
}

/// Case-insensitive handle equality.
pub fn same_username(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Handles are 1 to 15 ASCII letters, digits or underscores.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
