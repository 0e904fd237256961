//! The page-hosted follow agent.
//!
//! One [`FollowAgent`] lives in each page context. It holds no authoritative
//! state: every decision starts from a fresh store read, so a navigation or a
//! restart loses nothing.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use followloop_config::{AgentConfig, BrowserConfig};
use followloop_protocols::{
    AgentCommand, CommandResponse, PageDriver, PageId, RunState, Settings, StoreError,
    is_valid_username, same_username,
};
use followloop_queue::TaskQueue;
use followloop_runtime::{RetryPolicy, jittered_interval, think_time};
use followloop_store::AgentStore;

use crate::error::{AgentError, AgentResult};
use crate::machine::{self, ActionPlan, AgentPhase, LoadDecision, StopReason};

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;

/// Whether an action aborts when the run flag is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionScope {
    /// Part of a run; re-checks the run flag at every await boundary.
    Session,
    /// Issued directly by a command; runs to completion.
    Manual,
}

/// Result of one page-load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The agent is not running here.
    Idle,
    /// Running, but this page is not the target.
    Waiting,
    /// The page is heading to the next target.
    Navigated { username: String },
    /// The run ended.
    Stopped(StopReason),
    /// The run flag was cleared mid-pass; nothing further was done.
    Cancelled,
    /// Another pass is already processing this page.
    Busy,
}

/// Result of a start command.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    AlreadyRunning(RunState),
    Started {
        state: RunState,
        target: String,
        /// The target is the page already loaded; process without navigating.
        on_page: bool,
    },
}

/// Follow/unfollow state machine bound to one page.
#[derive(Clone)]
pub struct FollowAgent {
    pub(crate) page_id: PageId,
    pub(crate) store: AgentStore,
    pub(crate) queue: TaskQueue,
    pub(crate) page: Arc<dyn PageDriver>,
    pub(crate) config: AgentConfig,
    pub(crate) browser: BrowserConfig,
    phase: Arc<RwLock<AgentPhase>>,
    /// Held by the pass processing this page, until it navigates away.
    in_flight: Arc<Mutex<()>>,
}

impl FollowAgent {
    pub fn new(page_id: impl Into<PageId>, store: AgentStore, page: Arc<dyn PageDriver>) -> Self {
        Self {
            page_id: page_id.into(),
            queue: TaskQueue::new(store.clone()),
            store,
            page,
            config: AgentConfig::default(),
            browser: BrowserConfig::default(),
            phase: Arc::new(RwLock::new(AgentPhase::Idle)),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Last phase this instance entered. Advisory only.
    pub fn phase(&self) -> AgentPhase {
        *self.phase.read()
    }

    pub(crate) fn set_phase(&self, phase: AgentPhase) {
        let mut current = self.phase.write();
        if *current != phase {
            debug!("Agent phase {} -> {}", *current, phase);
            *current = phase;
        }
    }

    /// Serve a relayed command.
    pub async fn handle(&self, command: AgentCommand) -> CommandResponse {
        debug!("Agent handling '{}'", command.name());
        let result = match command {
            AgentCommand::Ping => Ok(CommandResponse::ok_with_message("pong")),
            AgentCommand::StartFollowAgent => self.handle_start().await,
            AgentCommand::StopFollowAgent => self
                .stop()
                .await
                .map(|state| CommandResponse::ok_with_message("Agent stopped successfully").with_state(state)),
            AgentCommand::GetAgentStatus => self.status().await.map(|state| CommandResponse::ok().with_state(state)),
            AgentCommand::CheckFollowStatus { username } => {
                self.manual_check(&username).await.map(|status| CommandResponse::ok().with_follow_status(status))
            }
            AgentCommand::FollowUser { username } => self.manual_follow(&username).await,
            AgentCommand::UnfollowUser { username } => self.manual_unfollow(&username).await,
            AgentCommand::ExtractUsernames { options } => self
                .extract(options)
                .await
                .map(|summary| CommandResponse::ok().with_extraction(summary)),
        };

        result.unwrap_or_else(|e| CommandResponse::failure(e.to_string()))
    }

    async fn handle_start(&self) -> AgentResult<CommandResponse> {
        let outcome = self.start().await?;
        let state = match &outcome {
            StartOutcome::AlreadyRunning(state) => {
                return Ok(CommandResponse::ok_with_message("Agent already running").with_state(state.clone()));
            }
            StartOutcome::Started { state, .. } => state.clone(),
        };

        let agent = self.clone();
        tokio::spawn(async move {
            if let Err(e) = agent.follow_through(outcome).await {
                error!("Agent start follow-through failed: {}", e);
            }
        });
        Ok(CommandResponse::ok_with_message("Agent started successfully").with_state(state))
    }

    /// Persist a new run and choose its first target.
    pub async fn start(&self) -> AgentResult<StartOutcome> {
        let snapshot = self.store.snapshot().await?;
        if snapshot.run_state.is_running {
            warn!("Agent start requested, but already running");
            return Ok(StartOutcome::AlreadyRunning(snapshot.run_state));
        }

        let settings = &snapshot.settings;
        if !settings.any_mode_enabled() {
            return Err(AgentError::Rejected(
                "Auto-follow and auto-unfollow are disabled.".to_string(),
            ));
        }

        let now = Utc::now();
        let mut state = snapshot.run_state;
        state.roll_over(now);

        let follow_target = if settings.enable_auto_follow
            && state.follows_today(now) < settings.daily_follow_limit
        {
            followloop_queue::next_follow_candidate(&snapshot.queue, &snapshot.history)
                .map(|r| r.username.clone())
        } else {
            None
        };

        if follow_target.is_none() && !settings.enable_auto_unfollow {
            return Err(AgentError::Rejected(
                "No users left in the queue to follow.".to_string(),
            ));
        }

        let on_page_profile = self.current_profile().await;
        let (target, on_page) = match follow_target {
            Some(target) => {
                let on_page = on_page_profile
                    .as_deref()
                    .is_some_and(|p| same_username(p, &target));
                (target, on_page)
            }
            None => {
                // Unfollow only: a followed profile already on screen is checked in place.
                let on_screen = on_page_profile.filter(|p| {
                    snapshot
                        .history
                        .iter()
                        .any(|r| r.matches(p) && r.is_active_follow())
                });
                match on_screen {
                    Some(profile) => (profile, true),
                    None => {
                        let candidate = followloop_queue::next_unfollow_candidate(
                            &snapshot.history,
                            settings.unfollow_threshold_secs(),
                            now,
                        )
                        .ok_or_else(|| {
                            AgentError::Rejected(
                                "Nothing to process: the queue is empty and no follows are eligible for unfollow."
                                    .to_string(),
                            )
                        })?;
                        (candidate.username.clone(), false)
                    }
                }
            }
        };

        state.begin(now, self.page_id.clone(), Some(target.clone()));
        self.store.save_run_state(&state).await?;
        info!(target: "status", "Agent started on {}, first target @{}", self.page_id, target);

        Ok(StartOutcome::Started {
            state,
            target,
            on_page,
        })
    }

    /// Carry out a successful start: process in place or navigate to the target.
    pub async fn follow_through(&self, outcome: StartOutcome) -> AgentResult<PassOutcome> {
        let StartOutcome::Started { target, on_page, .. } = outcome else {
            return Ok(PassOutcome::Idle);
        };

        if on_page {
            return self.process_current_user(&target).await;
        }

        self.set_phase(AgentPhase::Navigating);
        sleep(self.config.start_navigation_delay()).await;
        if !self.store.run_state().await?.is_running {
            return Ok(PassOutcome::Cancelled);
        }
        self.page.navigate(&self.browser.profile_url(&target)).await?;
        info!(target: "status", "Navigating to @{}", target);
        Ok(PassOutcome::Navigated { username: target })
    }

    /// Persist the stop. Safe from any phase.
    pub async fn stop(&self) -> AgentResult<RunState> {
        let state = self.store.update_run_state(RunState::stop).await?;
        self.set_phase(AgentPhase::Stopped);
        info!(target: "status", "Agent stopped");
        Ok(state)
    }

    pub async fn status(&self) -> AgentResult<RunState> {
        Ok(self.store.run_state().await?)
    }

    /// Entry point for every new document in this page.
    pub async fn on_page_load(&self) -> AgentResult<PassOutcome> {
        let retry = RetryPolicy::linear(self.config.store_retry_attempts, self.config.store_retry_base());
        let state = retry
            .run("Loading run state", |_| self.store.run_state(), StoreError::is_transient)
            .await?;

        let profile = self.current_profile().await;
        let decision = machine::decide_on_load(&state, &self.page_id, profile.as_deref());
        self.set_phase(decision.phase());

        match decision {
            LoadDecision::Idle => Ok(PassOutcome::Idle),
            LoadDecision::NotOwner { owner } => {
                debug!("Run is owned by {}, {} stays idle", owner, self.page_id);
                Ok(PassOutcome::Idle)
            }
            LoadDecision::NoTarget => {
                debug!("Agent running without a target");
                Ok(PassOutcome::Waiting)
            }
            LoadDecision::Mismatch { expected, found } => {
                info!(
                    "Current page ({}) does not match target @{}; waiting",
                    found.as_deref().unwrap_or("no profile"),
                    expected
                );
                Ok(PassOutcome::Waiting)
            }
            LoadDecision::Process(username) => self.process_current_user(&username).await,
        }
    }

    /// Process the target shown on this page, then move on.
    ///
    /// At most one pass runs per page; a concurrent call returns
    /// [`PassOutcome::Busy`]. Errors other than action failures halt the run.
    pub async fn process_current_user(&self, username: &str) -> AgentResult<PassOutcome> {
        let Ok(pass) = self.in_flight.clone().try_lock_owned() else {
            debug!("@{} is already being processed on {}, skipping", username, self.page_id);
            return Ok(PassOutcome::Busy);
        };
        match self.process_step(username, pass).await {
            Ok(outcome) => Ok(outcome),
            Err(AgentError::Stopped) => {
                info!("Agent stopped while processing @{}", username);
                Ok(PassOutcome::Cancelled)
            }
            Err(e) => {
                error!("Critical error processing @{}: {}", username, e);
                let reason = StopReason::Fatal {
                    message: e.to_string(),
                };
                self.halt(&reason).await?;
                Ok(PassOutcome::Stopped(reason))
            }
        }
    }

    async fn process_step(&self, username: &str, pass: OwnedMutexGuard<()>) -> AgentResult<PassOutcome> {
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;
        let mut state = snapshot.run_state;

        let is_target = state
            .current_user
            .as_deref()
            .is_some_and(|u| same_username(u, username));
        if !state.is_running || !is_target {
            return Ok(PassOutcome::Cancelled);
        }

        state.roll_over(now);
        if let Some(reason) = machine::check_guards(
            &state,
            &snapshot.settings,
            now,
            self.config.max_consecutive_errors,
        ) {
            self.halt(&reason).await?;
            return Ok(PassOutcome::Stopped(reason));
        }

        if !is_valid_username(username) {
            warn!("Invalid username in run state: {}, skipping", username);
            self.queue.remove(username).await?;
            let limit = self.config.error_log_limit;
            self.store
                .update_run_state(|s| s.log_error(username, "Invalid username, skipped", now, limit))
                .await?;
            return self.advance(pass).await;
        }

        self.set_phase(AgentPhase::Processing);
        info!(target: "status", "Processing @{}", username);

        match self.act_on(username, &snapshot.settings).await {
            Ok(()) => {}
            Err(e) if e.is_action_failure() => {
                warn!("Action on @{} failed: {}", username, e);
                self.record_failure(username, e.to_string()).await?;
            }
            Err(e) => return Err(e),
        }

        self.advance(pass).await
    }

    /// Check the target and apply the planned action.
    async fn act_on(&self, username: &str, settings: &Settings) -> AgentResult<()> {
        let status = self.check_follow_status(username, ActionScope::Session).await?;
        debug!("Follow status of @{}: {:?}", username, status);

        let queue = self.queue.list().await?;
        let history = self.queue.history().await?;
        let plan = machine::plan_action(status, username, &queue, &history, settings, Utc::now());

        match plan {
            ActionPlan::Follow => {
                if self.follow_user(username, settings, ActionScope::Session).await? {
                    let now = Utc::now();
                    self.queue.mark_followed(username, now).await?;
                    self.store.update_run_state(|s| s.record_follow(now)).await?;
                    info!(target: "status", "Followed @{}", username);
                } else {
                    self.record_failure(username, "Follow attempt failed verification").await?;
                }
            }
            ActionPlan::Unfollow => {
                if self.unfollow_user(username, settings, ActionScope::Session).await? {
                    let now = Utc::now();
                    self.queue.mark_unfollowed(username, now).await?;
                    self.queue.remove(username).await?;
                    self.store.update_run_state(|s| s.record_unfollow(now)).await?;
                    info!(target: "status", "Unfollowed @{}", username);
                } else {
                    self.record_failure(username, "Unfollow verification failed").await?;
                }
            }
            ActionPlan::Dequeue => {
                info!(target: "status", "Already following @{}, skipping", username);
                self.queue.remove(username).await?;
                self.store.update_run_state(RunState::record_success).await?;
            }
            ActionPlan::ExternallyUnfollowed => {
                info!(target: "status", "@{} is no longer followed, recording unfollow", username);
                self.queue.mark_unfollowed(username, Utc::now()).await?;
                self.store.update_run_state(RunState::record_success).await?;
            }
            ActionPlan::Pass => {
                debug!("No enabled action applies to @{}", username);
            }
        }
        Ok(())
    }

    async fn record_failure(&self, username: &str, message: impl Into<String>) -> AgentResult<()> {
        let message = message.into();
        let limit = self.config.error_log_limit;
        let state = self
            .store
            .update_run_state(|s| s.record_failure(username, message, Utc::now(), limit))
            .await?;
        warn!(
            target: "status",
            "Failure on @{} ({} in a row)",
            username,
            state.consecutive_errors
        );
        Ok(())
    }

    /// Choose the next target, wait out the pacing delay and navigate.
    async fn advance(&self, pass: OwnedMutexGuard<()>) -> AgentResult<PassOutcome> {
        let now = Utc::now();
        let snapshot = self.store.snapshot().await?;
        if !snapshot.run_state.is_running {
            return Ok(PassOutcome::Cancelled);
        }

        if let Some(reason) = machine::check_breaker(&snapshot.run_state, self.config.max_consecutive_errors) {
            self.halt(&reason).await?;
            return Ok(PassOutcome::Stopped(reason));
        }

        let next = machine::select_next_target(
            &snapshot.queue,
            &snapshot.history,
            &snapshot.settings,
            &snapshot.run_state,
            now,
        );
        let Some(next) = next else {
            let reason = StopReason::Exhausted;
            self.halt(&reason).await?;
            return Ok(PassOutcome::Stopped(reason));
        };
        let username = next.username().to_string();

        let state = self
            .store
            .update_run_state(|s| {
                if s.is_running {
                    s.current_user = Some(username.clone());
                }
            })
            .await?;
        if !state.is_running {
            return Ok(PassOutcome::Cancelled);
        }

        self.set_phase(AgentPhase::Navigating);
        let settings = &snapshot.settings;
        let (min_think, max_think) = settings.think_time_bounds();
        let delay = jittered_interval(
            settings.interval(),
            settings.variance_fraction(),
            self.config.min_navigation_delay(),
        ) + think_time(min_think, max_think);
        info!(
            target: "status",
            "Waiting {}s before navigating to @{} for {}",
            delay.as_secs(),
            username,
            next.action()
        );
        sleep(delay).await;

        if !self.store.run_state().await?.is_running {
            info!("Agent stopped during navigation delay, not navigating");
            return Ok(PassOutcome::Cancelled);
        }

        // The next document runs its own pass.
        drop(pass);
        self.page.navigate(&self.browser.profile_url(&username)).await?;
        Ok(PassOutcome::Navigated { username })
    }

    /// Persist the stop for `reason`.
    async fn halt(&self, reason: &StopReason) -> AgentResult<()> {
        let limit = self.config.error_log_limit;
        let message = reason.log_message();
        self.store
            .update_run_state(|s| {
                if let Some(message) = message {
                    s.log_error("agent", message, Utc::now(), limit);
                }
                s.stop();
            })
            .await?;
        self.set_phase(AgentPhase::Stopped);
        info!(target: "status", "Agent stopped: {}", reason);
        Ok(())
    }

    /// Handle addressed by the current page, if it is a profile.
    pub(crate) async fn current_profile(&self) -> Option<String> {
        match self.page.current_url().await {
            Ok(url) => machine::profile_from_url(&url, &self.browser.allowed_hosts),
            Err(e) => {
                warn!("Could not read page URL: {}", e);
                None
            }
        }
    }

    /// Fail with [`AgentError::Stopped`] once a session action's run flag is cleared.
    pub(crate) async fn ensure_active(&self, scope: ActionScope) -> AgentResult<()> {
        if scope == ActionScope::Session && !self.store.run_state().await?.is_running {
            return Err(AgentError::Stopped);
        }
        Ok(())
    }

    pub(crate) fn validated(username: &str) -> AgentResult<&str> {
        let trimmed = username.trim().trim_start_matches('@');
        if is_valid_username(trimmed) {
            Ok(trimmed)
        } else {
            Err(AgentError::InvalidUsername(username.to_string()))
        }
    }
}
