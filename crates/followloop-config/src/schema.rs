//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use followloop_protocols::Settings;

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    /// Settings written on first initialization.
    #[serde(default)]
    pub defaults: Settings,
}

/// Persistent store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    /// Storage directory with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.path))
    }
}

fn default_storage_path() -> String {
    "~/.followloop/store".to_string()
}

/// Browser connection and target site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome remote debugging endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Base URL of the automated site; profiles live at `{site_url}/{username}`.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Hosts the orchestrator agrees to drive.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            site_url: default_site_url(),
            allowed_hosts: default_allowed_hosts(),
        }
    }
}

impl BrowserConfig {
    /// Profile URL of `username`.
    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), username)
    }
}

fn default_endpoint() -> String {
    "http://localhost:9222".to_string()
}

fn default_site_url() -> String {
    "https://x.com".to_string()
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["x.com".to_string(), "twitter.com".to_string()]
}

/// Agent pacing and polling parameters. Durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Settle time after a page load before the agent inspects it.
    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Error log entries kept in the run state.
    #[serde(default = "default_error_log_limit")]
    pub error_log_limit: usize,

    /// Consecutive failures that trip the circuit breaker.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Floor of the jittered inter-action delay.
    #[serde(default = "default_min_navigation_delay_ms")]
    pub min_navigation_delay_ms: u64,

    /// Pause between the start command and the first navigation.
    #[serde(default = "default_start_navigation_delay_ms")]
    pub start_navigation_delay_ms: u64,

    /// Wait before searching for the follow button.
    #[serde(default = "default_control_search_delay_ms")]
    pub control_search_delay_ms: u64,

    #[serde(default = "default_control_poll_interval_ms")]
    pub control_poll_interval_ms: u64,

    #[serde(default = "default_control_poll_attempts")]
    pub control_poll_attempts: u32,

    /// Wait after scrolling a control into view.
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,

    /// Wait after a follow click before verifying.
    #[serde(default = "default_follow_verify_delay_ms")]
    pub follow_verify_delay_ms: u64,

    /// Wait for the unfollow confirmation sheet.
    #[serde(default = "default_confirm_dialog_delay_ms")]
    pub confirm_dialog_delay_ms: u64,

    #[serde(default = "default_status_initial_delay_ms")]
    pub status_initial_delay_ms: u64,

    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    #[serde(default = "default_status_poll_attempts")]
    pub status_poll_attempts: u32,

    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,

    /// Store availability retries on page load.
    #[serde(default = "default_store_retry_attempts")]
    pub store_retry_attempts: u32,

    #[serde(default = "default_store_retry_base_ms")]
    pub store_retry_base_ms: u64,

    /// Wait between extraction scroll steps.
    #[serde(default = "default_extraction_scroll_ms")]
    pub extraction_scroll_ms: u64,

    /// Scroll steps without new cells before extraction stops.
    #[serde(default = "default_extraction_stall_limit")]
    pub extraction_stall_limit: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            page_settle_ms: default_page_settle_ms(),
            error_log_limit: default_error_log_limit(),
            max_consecutive_errors: default_max_consecutive_errors(),
            min_navigation_delay_ms: default_min_navigation_delay_ms(),
            start_navigation_delay_ms: default_start_navigation_delay_ms(),
            control_search_delay_ms: default_control_search_delay_ms(),
            control_poll_interval_ms: default_control_poll_interval_ms(),
            control_poll_attempts: default_control_poll_attempts(),
            scroll_settle_ms: default_scroll_settle_ms(),
            follow_verify_delay_ms: default_follow_verify_delay_ms(),
            confirm_dialog_delay_ms: default_confirm_dialog_delay_ms(),
            status_initial_delay_ms: default_status_initial_delay_ms(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            status_poll_attempts: default_status_poll_attempts(),
            status_timeout_ms: default_status_timeout_ms(),
            store_retry_attempts: default_store_retry_attempts(),
            store_retry_base_ms: default_store_retry_base_ms(),
            extraction_scroll_ms: default_extraction_scroll_ms(),
            extraction_stall_limit: default_extraction_stall_limit(),
        }
    }
}

impl AgentConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn min_navigation_delay(&self) -> Duration {
        Duration::from_millis(self.min_navigation_delay_ms)
    }

    pub fn start_navigation_delay(&self) -> Duration {
        Duration::from_millis(self.start_navigation_delay_ms)
    }

    pub fn control_search_delay(&self) -> Duration {
        Duration::from_millis(self.control_search_delay_ms)
    }

    pub fn control_poll_interval(&self) -> Duration {
        Duration::from_millis(self.control_poll_interval_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn follow_verify_delay(&self) -> Duration {
        Duration::from_millis(self.follow_verify_delay_ms)
    }

    pub fn confirm_dialog_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_dialog_delay_ms)
    }

    pub fn status_initial_delay(&self) -> Duration {
        Duration::from_millis(self.status_initial_delay_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn store_retry_base(&self) -> Duration {
        Duration::from_millis(self.store_retry_base_ms)
    }

    pub fn extraction_scroll(&self) -> Duration {
        Duration::from_millis(self.extraction_scroll_ms)
    }
}

fn default_page_settle_ms() -> u64 {
    2500
}

fn default_error_log_limit() -> usize {
    50
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_min_navigation_delay_ms() -> u64 {
    1000
}

fn default_start_navigation_delay_ms() -> u64 {
    100
}

fn default_control_search_delay_ms() -> u64 {
    1000
}

fn default_control_poll_interval_ms() -> u64 {
    500
}

fn default_control_poll_attempts() -> u32 {
    15
}

fn default_scroll_settle_ms() -> u64 {
    800
}

fn default_follow_verify_delay_ms() -> u64 {
    1500
}

fn default_confirm_dialog_delay_ms() -> u64 {
    1000
}

fn default_status_initial_delay_ms() -> u64 {
    500
}

fn default_status_poll_interval_ms() -> u64 {
    300
}

fn default_status_poll_attempts() -> u32 {
    40
}

fn default_status_timeout_ms() -> u64 {
    20_000
}

fn default_store_retry_attempts() -> u32 {
    5
}

fn default_store_retry_base_ms() -> u64 {
    1500
}

fn default_extraction_scroll_ms() -> u64 {
    1500
}

fn default_extraction_stall_limit() -> u32 {
    3
}

/// Orchestrator handshake and relay parameters. Durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Liveness ping deadline.
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,

    /// Deadline for ordinary commands.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Deadline for commands that answer asynchronously.
    #[serde(default = "default_long_response_timeout_ms")]
    pub long_response_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff grows linearly from this base.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Wait after injecting a script.
    #[serde(default = "default_injection_settle_ms")]
    pub injection_settle_ms: u64,

    /// Wait between the readiness check and the relayed command.
    #[serde(default = "default_pre_send_settle_ms")]
    pub pre_send_settle_ms: u64,

    /// How often the page watcher looks for a new document.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_timeout_ms: default_ping_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            long_response_timeout_ms: default_long_response_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            injection_settle_ms: default_injection_settle_ms(),
            pre_send_settle_ms: default_pre_send_settle_ms(),
            watch_interval_ms: default_watch_interval_ms(),
        }
    }
}

impl RelayConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn long_response_timeout(&self) -> Duration {
        Duration::from_millis(self.long_response_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn injection_settle(&self) -> Duration {
        Duration::from_millis(self.injection_settle_ms)
    }

    pub fn pre_send_settle(&self) -> Duration {
        Duration::from_millis(self.pre_send_settle_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

fn default_ping_timeout_ms() -> u64 {
    300
}

fn default_response_timeout_ms() -> u64 {
    3000
}

fn default_long_response_timeout_ms() -> u64 {
    120_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_injection_settle_ms() -> u64 {
    500
}

fn default_pre_send_settle_ms() -> u64 {
    800
}

fn default_watch_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_url() {
        let browser = BrowserConfig::default();
        assert_eq!(browser.profile_url("alice"), "https://x.com/alice");

        let trailing = BrowserConfig {
            site_url: "https://x.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(trailing.profile_url("bob"), "https://x.com/bob");
    }

    #[test]
    fn test_agent_defaults() {
        let agent = AgentConfig::default();
        assert_eq!(agent.max_consecutive_errors, 5);
        assert_eq!(agent.error_log_limit, 50);
        assert_eq!(agent.control_poll_attempts, 15);
        assert_eq!(agent.status_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_relay_defaults() {
        let relay = RelayConfig::default();
        assert_eq!(relay.ping_timeout(), Duration::from_millis(300));
        assert_eq!(relay.max_attempts, 3);
    }

    #[test]
    fn test_storage_path_expanded() {
        let storage = StorageConfig::default();
        assert!(!storage.resolved_path().to_string_lossy().starts_with('~'));
    }
}
