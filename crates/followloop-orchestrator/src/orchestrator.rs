//! Script handshake and command relay.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use followloop_config::{BrowserConfig, RelayConfig};
use followloop_protocols::{AgentCommand, ChannelError, CommandResponse, PageChannel, ScriptKind};
use followloop_runtime::RetryPolicy;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::guard::check_page_url;

/// Coordinates page contexts without touching their DOM.
///
/// Every command goes through [`Orchestrator::relay`], which checks the page
/// URL, makes sure both scripts answer in the current document and retries
/// transient transport failures with linear backoff.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) channel: Arc<dyn PageChannel>,
    pub(crate) relay: RelayConfig,
    pub(crate) browser: BrowserConfig,
}

impl Orchestrator {
    pub fn new(channel: Arc<dyn PageChannel>) -> Self {
        Self {
            channel,
            relay: RelayConfig::default(),
            browser: BrowserConfig::default(),
        }
    }

    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    pub fn channel(&self) -> &Arc<dyn PageChannel> {
        &self.channel
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.relay.max_attempts, self.relay.backoff_base())
    }

    /// Current URL of `page`, rejected unless it is on the automated site.
    pub async fn check_page(&self, page: &str) -> OrchestratorResult<String> {
        let url = self.channel.page_url(page).await?;
        check_page_url(&url, &self.browser.allowed_hosts)?;
        Ok(url)
    }

    /// Make sure both scripts answer in the page's current document.
    ///
    /// Idempotent: a page that already answers `ping` with both scripts
    /// loaded is left untouched.
    pub async fn ensure_ready(&self, page: &str) -> OrchestratorResult<()> {
        self.retry_policy()
            .run("Script handshake", |_| self.try_ready(page), OrchestratorError::is_transient)
            .await
    }

    async fn try_ready(&self, page: &str) -> OrchestratorResult<()> {
        let alive = self.ping(page).await;
        let status = self.channel.script_status(page).await?;
        if alive && status.is_ready() {
            return Ok(());
        }

        let missing: Vec<ScriptKind> = if alive {
            ScriptKind::ORDER
                .into_iter()
                .filter(|script| !status.is_loaded(*script))
                .collect()
        } else {
            ScriptKind::ORDER.to_vec()
        };

        for script in missing {
            debug!("Injecting {:?} script into {}", script, page);
            self.channel.inject(page, script).await?;
            sleep(self.relay.injection_settle()).await;
        }

        if self.channel.script_status(page).await?.is_ready() {
            info!("Scripts ready on {}", page);
            Ok(())
        } else {
            Err(OrchestratorError::NotReady { page: page.to_string() })
        }
    }

    async fn ping(&self, page: &str) -> bool {
        match timeout(self.relay.ping_timeout(), self.channel.send(page, AgentCommand::Ping)).await {
            Ok(Ok(response)) => response.success,
            Ok(Err(e)) => {
                debug!("Ping to {} failed: {}", page, e);
                false
            }
            Err(_) => {
                debug!("Ping to {} timed out", page);
                false
            }
        }
    }

    /// Forward `command` to the page and return its response as-is.
    ///
    /// Transient failures are retried; once attempts run out the terminal
    /// [`OrchestratorError::RetriesExhausted`] is returned.
    pub async fn relay(&self, page: &str, command: AgentCommand) -> OrchestratorResult<CommandResponse> {
        self.check_page(page).await?;
        let name = command.name();

        let result = self
            .retry_policy()
            .run(
                name,
                |_| self.try_relay(page, command.clone()),
                OrchestratorError::is_transient,
            )
            .await;

        match result {
            Err(e) if e.is_transient() => {
                warn!("Giving up on '{}' for {}: {}", name, page, e);
                Err(OrchestratorError::RetriesExhausted {
                    command: name.to_string(),
                    last_error: e.to_string(),
                })
            }
            other => other,
        }
    }

    /// Relay and turn a `success: false` response into [`OrchestratorError::Rejected`].
    pub async fn request(&self, page: &str, command: AgentCommand) -> OrchestratorResult<CommandResponse> {
        self.relay(page, command)
            .await?
            .into_result()
            .map_err(OrchestratorError::Rejected)
    }

    async fn try_relay(&self, page: &str, command: AgentCommand) -> OrchestratorResult<CommandResponse> {
        self.try_ready(page).await?;
        sleep(self.relay.pre_send_settle()).await;
        self.send(page, command).await
    }

    /// Single delivery attempt bounded by the command's response deadline.
    pub async fn send(&self, page: &str, command: AgentCommand) -> OrchestratorResult<CommandResponse> {
        let deadline = self.deadline_for(&command);
        let name = command.name();
        match timeout(deadline, self.channel.send(page, command)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ChannelError::Timeout {
                command: name.to_string(),
                after_ms: deadline.as_millis() as u64,
            }
            .into()),
        }
    }

    fn deadline_for(&self, command: &AgentCommand) -> Duration {
        if command.is_long_running() {
            self.relay.long_response_timeout()
        } else {
            self.relay.response_timeout()
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
