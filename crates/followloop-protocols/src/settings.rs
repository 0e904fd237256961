//! User-tunable automation settings, persisted under `agentSettings`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Seconds in a day.
const DAY_SECS: u64 = 86_400;

/// `unfollowSeconds` below this is ignored in favour of `unfollowDays`.
pub const MIN_UNFOLLOW_SECONDS: u64 = 5;

/// Automation settings. Read fresh at every decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// A stored zero decodes as the default.
    #[serde(default = "default_daily_follow_limit", deserialize_with = "limit_or_default")]
    pub daily_follow_limit: u32,

    /// Zero disables the hourly cap.
    #[serde(default)]
    pub hourly_follow_limit: u32,

    /// Zero disables the per-session cap.
    #[serde(default)]
    pub max_actions_session: u32,

    /// Base delay between actions, in seconds.
    #[serde(default = "default_follow_interval")]
    pub follow_interval: u64,

    /// Jitter applied to `follow_interval`, in percent.
    #[serde(default = "default_time_variance")]
    pub time_variance: u32,

    #[serde(default = "default_unfollow_days")]
    pub unfollow_days: u32,

    /// Overrides `unfollow_days` when set to at least [`MIN_UNFOLLOW_SECONDS`].
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub unfollow_seconds: Option<u64>,

    /// Lower think-time bound, in milliseconds.
    #[serde(default = "default_min_thinking_time")]
    pub min_thinking_time: u64,

    /// Upper think-time bound, in milliseconds.
    #[serde(default = "default_max_thinking_time")]
    pub max_thinking_time: u64,

    #[serde(default = "default_true")]
    pub enable_auto_follow: bool,

    #[serde(default)]
    pub enable_auto_unfollow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_follow_limit: default_daily_follow_limit(),
            hourly_follow_limit: 0,
            max_actions_session: 0,
            follow_interval: default_follow_interval(),
            time_variance: default_time_variance(),
            unfollow_days: default_unfollow_days(),
            unfollow_seconds: None,
            min_thinking_time: default_min_thinking_time(),
            max_thinking_time: default_max_thinking_time(),
            enable_auto_follow: true,
            enable_auto_unfollow: false,
            last_updated: None,
        }
    }
}

impl Settings {
    /// Unfollow threshold in seconds, or `None` when no threshold applies.
    pub fn unfollow_threshold_secs(&self) -> Option<u64> {
        match self.unfollow_seconds {
            Some(secs) if secs >= MIN_UNFOLLOW_SECONDS => Some(secs),
            _ if self.unfollow_days > 0 => Some(u64::from(self.unfollow_days) * DAY_SECS),
            _ => None,
        }
    }

    /// Base inter-action interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.follow_interval)
    }

    /// Jitter as a fraction of the interval (0.2 for 20%).
    pub fn variance_fraction(&self) -> f64 {
        f64::from(self.time_variance) / 100.0
    }

    /// Think-time bounds, normalised so the lower bound never exceeds the upper.
    pub fn think_time_bounds(&self) -> (Duration, Duration) {
        let min = self.min_thinking_time.min(self.max_thinking_time);
        let max = self.min_thinking_time.max(self.max_thinking_time);
        (Duration::from_millis(min), Duration::from_millis(max))
    }

    /// At least one automation mode is on.
    pub fn any_mode_enabled(&self) -> bool {
        self.enable_auto_follow || self.enable_auto_unfollow
    }
}

fn default_daily_follow_limit() -> u32 {
    50
}

fn default_follow_interval() -> u64 {
    60
}

fn default_time_variance() -> u32 {
    20
}

fn default_unfollow_days() -> u32 {
    3
}

fn default_min_thinking_time() -> u64 {
    100
}

fn default_max_thinking_time() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn limit_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u32>::deserialize(deserializer)? {
        None | Some(0) => Ok(default_daily_follow_limit()),
        Some(limit) => Ok(limit),
    }
}

/// Accepts a number, a numeric string, an empty string or null.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_u64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid unfollowSeconds value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.daily_follow_limit, 50);
        assert_eq!(settings.follow_interval, 60);
        assert_eq!(settings.time_variance, 20);
        assert!(settings.enable_auto_follow);
        assert!(!settings.enable_auto_unfollow);
    }

    #[test]
    fn test_threshold_prefers_seconds() {
        let settings = Settings {
            unfollow_seconds: Some(60),
            ..Default::default()
        };
        assert_eq!(settings.unfollow_threshold_secs(), Some(60));
    }

    #[test]
    fn test_threshold_ignores_tiny_seconds() {
        let settings = Settings {
            unfollow_seconds: Some(3),
            unfollow_days: 2,
            ..Default::default()
        };
        assert_eq!(settings.unfollow_threshold_secs(), Some(2 * 86_400));
    }

    #[test]
    fn test_threshold_absent() {
        let settings = Settings {
            unfollow_seconds: None,
            unfollow_days: 0,
            ..Default::default()
        };
        assert_eq!(settings.unfollow_threshold_secs(), None);
    }

    #[test]
    fn test_lenient_unfollow_seconds() {
        let empty: Settings = serde_json::from_str(r#"{"unfollowSeconds": ""}"#).unwrap();
        assert_eq!(empty.unfollow_seconds, None);
        let text: Settings = serde_json::from_str(r#"{"unfollowSeconds": "90"}"#).unwrap();
        assert_eq!(text.unfollow_seconds, Some(90));
        let number: Settings = serde_json::from_str(r#"{"unfollowSeconds": 45}"#).unwrap();
        assert_eq!(number.unfollow_seconds, Some(45));
        assert!(serde_json::from_str::<Settings>(r#"{"unfollowSeconds": true}"#).is_err());
    }

    #[test]
    fn test_zero_daily_limit_decodes_as_default() {
        let zero: Settings = serde_json::from_str(r#"{"dailyFollowLimit": 0}"#).unwrap();
        assert_eq!(zero.daily_follow_limit, 50);
        let null: Settings = serde_json::from_str(r#"{"dailyFollowLimit": null}"#).unwrap();
        assert_eq!(null.daily_follow_limit, 50);
        let set: Settings = serde_json::from_str(r#"{"dailyFollowLimit": 12}"#).unwrap();
        assert_eq!(set.daily_follow_limit, 12);
    }

    #[test]
    fn test_think_time_bounds_normalised() {
        let settings = Settings {
            min_thinking_time: 900,
            max_thinking_time: 300,
            ..Default::default()
        };
        let (min, max) = settings.think_time_bounds();
        assert_eq!(min, Duration::from_millis(300));
        assert_eq!(max, Duration::from_millis(900));
    }

    #[test]
    fn test_camel_case_wire_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["dailyFollowLimit"], 50);
        assert_eq!(json["enableAutoUnfollow"], false);
        assert!(json.get("unfollowSeconds").is_none());
    }
}
