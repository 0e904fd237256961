//! End-to-end diagnostics driven through the relay.

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use followloop_protocols::{AgentCommand, FollowStatus, is_valid_username};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::guard::{check_page_url, is_profile_path};
use crate::orchestrator::Orchestrator;

/// Outcome of [`Orchestrator::run_scripted_test`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedTestReport {
    pub username: String,
    /// Follow state before anything was clicked.
    pub initial: FollowStatus,
    /// The follow click was verified.
    pub followed: bool,
    /// State after the wait. Absent when the follow step was skipped or failed.
    pub after_wait: Option<FollowStatus>,
    /// Result of the clean-up unfollow, when one was attempted.
    pub unfollowed: Option<bool>,
}

impl ScriptedTestReport {
    /// Already-followed targets pass without clicking anything.
    pub fn passed(&self) -> bool {
        if self.initial.following {
            return true;
        }
        self.followed && self.after_wait.is_some_and(|s| s.following) && self.unfollowed == Some(true)
    }
}

/// Readiness of one page, as seen from the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDiagnosis {
    pub url: String,
    pub on_site: bool,
    pub base_loaded: bool,
    pub agent_loaded: bool,
    pub profile_page: bool,
}

impl Orchestrator {
    /// Open the target's profile, follow, wait, re-check and undo the follow.
    pub async fn run_scripted_test(
        &self,
        page: &str,
        username: &str,
        wait: Duration,
    ) -> OrchestratorResult<ScriptedTestReport> {
        let username = username.trim().trim_start_matches('@');
        if !is_valid_username(username) {
            return Err(OrchestratorError::InvalidUsername(username.to_string()));
        }
        self.check_page(page).await?;

        let profile = self.browser.profile_url(username);
        info!("Scripted test: opening {}", profile);
        self.channel.navigate(page, &profile).await?;
        self.ensure_ready(page).await?;

        let initial = self.follow_status(page, username).await?;
        info!(
            "@{}: following={} follows_you={} unsure={}",
            username, initial.following, initial.follows_you, initial.unsure
        );
        let mut report = ScriptedTestReport {
            username: username.to_string(),
            initial,
            followed: false,
            after_wait: None,
            unfollowed: None,
        };
        if initial.following {
            info!("Already following @{}, nothing to test", username);
            return Ok(report);
        }

        let response = self
            .relay(page, AgentCommand::FollowUser { username: username.to_string() })
            .await?;
        report.followed = response.success;
        if !report.followed {
            warn!(
                "Scripted follow of @{} failed: {}",
                username,
                response.error.as_deref().unwrap_or("unknown error")
            );
            return Ok(report);
        }

        info!("Followed @{}, waiting {:?}", username, wait);
        sleep(wait).await;

        let after = self.follow_status(page, username).await?;
        report.after_wait = Some(after);
        if after.following {
            let response = self
                .relay(page, AgentCommand::UnfollowUser { username: username.to_string() })
                .await?;
            report.unfollowed = Some(response.success);
            info!("Clean-up unfollow of @{}: {}", username, response.success);
        } else {
            warn!("@{} no longer shows as followed after the wait", username);
        }

        Ok(report)
    }

    async fn follow_status(&self, page: &str, username: &str) -> OrchestratorResult<FollowStatus> {
        let response = self
            .request(page, AgentCommand::CheckFollowStatus { username: username.to_string() })
            .await?;
        response
            .follow_status
            .ok_or_else(|| OrchestratorError::Rejected("Response carried no follow status".to_string()))
    }

    /// Report the URL and script flags of a page without injecting anything.
    pub async fn diagnose(&self, page: &str) -> OrchestratorResult<PageDiagnosis> {
        let url = self.channel.page_url(page).await?;
        let status = self.channel.script_status(page).await?;
        let on_site = check_page_url(&url, &self.browser.allowed_hosts).is_ok();
        let profile_page = on_site && Url::parse(&url).is_ok_and(|u| is_profile_path(u.path()));
        Ok(PageDiagnosis {
            url,
            on_site,
            base_loaded: status.base_loaded,
            agent_loaded: status.agent_loaded,
            profile_page,
        })
    }
}
