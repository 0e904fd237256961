//! Follow, unfollow and status checks on the loaded profile.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use followloop_protocols::{CommandResponse, FollowState, FollowStatus, PageControl, Settings};
use followloop_runtime::{PollConfig, PollError, poll_until, think_time};

use crate::agent::{ActionScope, FollowAgent};
use crate::error::{AgentError, AgentResult};

impl FollowAgent {
    /// Poll the profile until a follow indicator appears.
    ///
    /// Gives up with `unsure` set rather than failing when nothing shows.
    pub async fn check_follow_status(&self, username: &str, scope: ActionScope) -> AgentResult<FollowStatus> {
        let config = PollConfig::new(self.config.status_poll_interval(), self.config.status_poll_attempts)
            .with_initial_delay(self.config.status_initial_delay())
            .with_timeout(self.config.status_timeout());

        let result = poll_until(&config, |_| async move {
            self.ensure_active(scope).await?;
            let probe = self.page.probe_follow_state().await?;
            Ok::<_, AgentError>(match probe.state {
                FollowState::Following => Some(FollowStatus {
                    following: true,
                    follows_you: probe.follows_you,
                    unsure: false,
                }),
                FollowState::NotFollowing => Some(FollowStatus {
                    following: false,
                    follows_you: probe.follows_you,
                    unsure: false,
                }),
                FollowState::Unknown => None,
            })
        })
        .await;

        match result {
            Ok(status) => Ok(status),
            Err(PollError::TimedOut { attempts }) => {
                warn!("Follow status of @{} undetermined after {} attempts", username, attempts);
                Ok(FollowStatus {
                    unsure: true,
                    ..Default::default()
                })
            }
            Err(PollError::Probe(e)) => Err(e),
        }
    }

    /// Click "Follow" and verify. `Ok(false)` when verification fails.
    pub async fn follow_user(&self, username: &str, settings: &Settings, scope: ActionScope) -> AgentResult<bool> {
        let (min_think, max_think) = settings.think_time_bounds();

        self.pause(self.config.control_search_delay(), scope).await?;
        debug!("Searching for follow button of @{}", username);
        self.wait_for_control(PageControl::Follow, scope).await?;

        self.pause(self.config.scroll_settle() + think_time(min_think, max_think), scope)
            .await?;
        if !self.page.click(PageControl::Follow).await? {
            return Err(AgentError::ControlNotFound {
                control: PageControl::Follow,
                attempts: 1,
            });
        }

        // Past the click the follow has happened; a stop must not lose it.
        sleep(self.config.follow_verify_delay()).await;
        let status = self.check_follow_status(username, ActionScope::Manual).await?;
        if !status.following {
            warn!("Follow of @{} failed verification", username);
        }
        Ok(status.following)
    }

    /// Open the unfollow sheet, confirm and verify.
    ///
    /// The run flag is only honoured before the first click.
    pub async fn unfollow_user(&self, username: &str, settings: &Settings, scope: ActionScope) -> AgentResult<bool> {
        let (min_think, max_think) = settings.think_time_bounds();

        self.wait_for_control(PageControl::Following, scope).await?;
        self.pause(think_time(min_think, max_think), scope).await?;
        if !self.page.click(PageControl::Following).await? {
            return Err(AgentError::ControlNotFound {
                control: PageControl::Following,
                attempts: 1,
            });
        }

        sleep(self.config.confirm_dialog_delay() + think_time(min_think, max_think)).await;
        if !self.page.click(PageControl::ConfirmUnfollow).await? {
            return Err(AgentError::ControlNotFound {
                control: PageControl::ConfirmUnfollow,
                attempts: 1,
            });
        }

        sleep(self.config.follow_verify_delay()).await;
        let probe = self.page.probe_follow_state().await?;
        let unfollowed = probe.state == FollowState::NotFollowing;
        if !unfollowed {
            warn!("Unfollow of @{} failed verification", username);
        }
        Ok(unfollowed)
    }

    async fn wait_for_control(&self, control: PageControl, scope: ActionScope) -> AgentResult<()> {
        let config = PollConfig::new(self.config.control_poll_interval(), self.config.control_poll_attempts);
        let result = poll_until(&config, |attempt| async move {
            self.ensure_active(scope).await?;
            let present = self.page.has_control(control).await?;
            if !present && attempt % 5 == 0 {
                debug!("Still searching for {} (attempt {})", control, attempt);
            }
            Ok::<_, AgentError>(present.then_some(()))
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(PollError::TimedOut { attempts }) => Err(AgentError::ControlNotFound { control, attempts }),
            Err(PollError::Probe(e)) => Err(e),
        }
    }

    async fn pause(&self, duration: Duration, scope: ActionScope) -> AgentResult<()> {
        sleep(duration).await;
        self.ensure_active(scope).await
    }

    pub(crate) async fn manual_check(&self, username: &str) -> AgentResult<FollowStatus> {
        let username = Self::validated(username)?;
        self.check_follow_status(username, ActionScope::Manual).await
    }

    /// Follow outside a run. A verified follow is recorded in history but not
    /// counted against the run limits.
    pub(crate) async fn manual_follow(&self, username: &str) -> AgentResult<CommandResponse> {
        let username = Self::validated(username)?;
        let settings = self.store.settings().await?;
        if self.follow_user(username, &settings, ActionScope::Manual).await? {
            self.queue.mark_followed(username, Utc::now()).await?;
            info!("Followed @{} on request", username);
            Ok(CommandResponse::ok_with_message(format!("Followed @{}", username)))
        } else {
            Ok(CommandResponse::failure(format!("Follow of @{} could not be verified", username)))
        }
    }

    pub(crate) async fn manual_unfollow(&self, username: &str) -> AgentResult<CommandResponse> {
        let username = Self::validated(username)?;
        let settings = self.store.settings().await?;
        if self.unfollow_user(username, &settings, ActionScope::Manual).await? {
            self.queue.mark_unfollowed(username, Utc::now()).await?;
            info!("Unfollowed @{} on request", username);
            Ok(CommandResponse::ok_with_message(format!("Unfollowed @{}", username)))
        } else {
            Ok(CommandResponse::failure(format!("Unfollow of @{} could not be verified", username)))
        }
    }
}
