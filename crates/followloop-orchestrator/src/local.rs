//! In-process page contexts.
//!
//! A [`PageHost`] plays the role of the scripts living inside one browser
//! tab: it remembers which scripts were injected into which document and
//! serves commands with a [`FollowAgent`]. [`LocalPageChannel`] routes
//! orchestrator calls to the registered hosts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use followloop_agent::{FollowAgent, PassOutcome};
use followloop_protocols::{
    AgentCommand, ChannelError, CommandResponse, PageChannel, PageDriver, PageId, ScriptKind, ScriptStatus,
};

/// Scripts of one page context, bound to the page's current document.
pub struct PageHost {
    driver: Arc<dyn PageDriver>,
    agent: FollowAgent,
    page_settle: Duration,
    /// Document each script was injected into.
    injected: Mutex<HashMap<ScriptKind, String>>,
    load_task: Mutex<Option<JoinHandle<()>>>,
}

impl PageHost {
    pub fn new(driver: Arc<dyn PageDriver>, agent: FollowAgent) -> Self {
        Self {
            driver,
            agent,
            page_settle: Duration::from_millis(1500),
            injected: Mutex::new(HashMap::new()),
            load_task: Mutex::new(None),
        }
    }

    /// Delay between agent injection and the page-load pass.
    pub fn with_page_settle(mut self, page_settle: Duration) -> Self {
        self.page_settle = page_settle;
        self
    }

    pub fn page_id(&self) -> &str {
        self.agent.page_id()
    }

    pub fn agent(&self) -> &FollowAgent {
        &self.agent
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub async fn script_status(&self) -> Result<ScriptStatus, ChannelError> {
        let document = self.driver.document_id().await?;
        let injected = self.injected.lock();
        let loaded = |script: ScriptKind| injected.get(&script) == Some(&document);
        Ok(ScriptStatus {
            base_loaded: loaded(ScriptKind::Base),
            agent_loaded: loaded(ScriptKind::Agent),
        })
    }

    /// Bind `script` to the current document. Injecting the agent schedules
    /// its page-load pass, replacing any pass still pending.
    pub async fn inject(&self, script: ScriptKind) -> Result<(), ChannelError> {
        let document = self.driver.document_id().await?;
        self.injected.lock().insert(script, document);
        debug!("{:?} script loaded in {}", script, self.page_id());

        if script == ScriptKind::Agent {
            let agent = self.agent.clone();
            let settle = self.page_settle;
            let task = tokio::spawn(async move {
                sleep(settle).await;
                match agent.on_page_load().await {
                    Ok(PassOutcome::Navigated { username }) => debug!("Agent moved on to @{}", username),
                    Ok(PassOutcome::Stopped(reason)) => info!("Agent stopped: {}", reason),
                    Ok(outcome) => debug!("Page-load pass finished: {:?}", outcome),
                    Err(e) => warn!("Page-load pass failed: {}", e),
                }
            });
            if let Some(previous) = self.load_task.lock().replace(task) {
                previous.abort();
            }
        }
        Ok(())
    }

    /// Serve a command if the script that answers it is loaded.
    pub async fn send(&self, command: AgentCommand) -> Result<CommandResponse, ChannelError> {
        let status = self.script_status().await?;
        let needed = if command.needs_agent() {
            ScriptKind::Agent
        } else {
            ScriptKind::Base
        };
        if !status.is_loaded(needed) {
            return Err(ChannelError::NoReceiver(self.page_id().to_string()));
        }
        Ok(self.agent.handle(command).await)
    }
}

impl Drop for PageHost {
    fn drop(&mut self) {
        if let Some(task) = self.load_task.get_mut().take() {
            task.abort();
        }
    }
}

/// [`PageChannel`] over hosts living in this process.
#[derive(Default)]
pub struct LocalPageChannel {
    hosts: DashMap<PageId, Arc<PageHost>>,
}

impl LocalPageChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, host: PageHost) -> Arc<PageHost> {
        let host = Arc::new(host);
        info!("Registered page {}", host.page_id());
        self.hosts.insert(host.page_id().to_string(), host.clone());
        host
    }

    pub fn remove(&self, page: &str) -> Option<Arc<PageHost>> {
        self.hosts.remove(page).map(|(_, host)| host)
    }

    pub fn host(&self, page: &str) -> Result<Arc<PageHost>, ChannelError> {
        self.hosts
            .get(page)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChannelError::PageNotFound(page.to_string()))
    }

    pub fn pages(&self) -> Vec<PageId> {
        self.hosts.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[async_trait]
impl PageChannel for LocalPageChannel {
    async fn send(&self, page: &str, command: AgentCommand) -> Result<CommandResponse, ChannelError> {
        self.host(page)?.send(command).await
    }

    async fn inject(&self, page: &str, script: ScriptKind) -> Result<(), ChannelError> {
        self.host(page)?.inject(script).await
    }

    async fn script_status(&self, page: &str) -> Result<ScriptStatus, ChannelError> {
        self.host(page)?.script_status().await
    }

    async fn page_url(&self, page: &str) -> Result<String, ChannelError> {
        Ok(self.host(page)?.driver.current_url().await?)
    }

    async fn document_id(&self, page: &str) -> Result<String, ChannelError> {
        Ok(self.host(page)?.driver.document_id().await?)
    }

    async fn navigate(&self, page: &str, url: &str) -> Result<(), ChannelError> {
        Ok(self.host(page)?.driver.navigate(url).await?)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
