//! Shared wiring: config, store and browser attachment.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use followloop_agent::FollowAgent;
use followloop_config::{Config, ConfigLoader, ConfigValidator};
use followloop_orchestrator::{LocalPageChannel, Orchestrator, PageHost, check_page_url};
use followloop_page_cdp::CdpPageDriver;
use followloop_protocols::{PageDriver, PageId};
use followloop_queue::TaskQueue;
use followloop_store::{AgentStore, FileStore};

pub(crate) type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub(crate) struct App {
    pub config: Config,
    pub store: AgentStore,
}

/// A browser tab with the agent hosted on it.
pub(crate) struct Attached {
    pub page: PageId,
    pub orchestrator: Orchestrator,
}

impl App {
    /// Load the config (an explicit path must exist) and open the store.
    pub async fn load(config_path: Option<&Path>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load(path)?,
            None => ConfigLoader::load_or_default(&ConfigLoader::default_path())?,
        };
        for warning in ConfigValidator::validate(&config).into_result()? {
            warn!("Config {}: {}", warning.path, warning.message);
        }

        let storage = config.storage.resolved_path();
        let store = AgentStore::new(Arc::new(FileStore::new(storage).await?));
        Ok(Self { config, store })
    }

    pub fn queue(&self) -> TaskQueue {
        TaskQueue::new(self.store.clone())
    }

    /// Attach to a tab over CDP and host the agent on it.
    pub async fn attach(&self, page: Option<&str>) -> CliResult<Attached> {
        let browser = &self.config.browser;
        let hosts = browser.allowed_hosts.clone();
        let driver = CdpPageDriver::connect(&browser.endpoint, page, |url| check_page_url(url, &hosts).is_ok()).await?;
        let page_id = driver.target_id().to_string();
        let driver: Arc<dyn PageDriver> = Arc::new(driver);

        let agent = FollowAgent::new(page_id.clone(), self.store.clone(), driver.clone())
            .with_config(self.config.agent.clone())
            .with_browser(browser.clone());
        let channel = Arc::new(LocalPageChannel::new());
        channel.register(PageHost::new(driver, agent).with_page_settle(self.config.agent.page_settle()));

        let orchestrator = Orchestrator::new(channel)
            .with_relay(self.config.relay.clone())
            .with_browser(browser.clone());
        info!("Attached to tab {}", page_id);
        Ok(Attached {
            page: page_id,
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use followloop_protocols::UserRecord;

    #[tokio::test]
    async fn test_load_opens_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let storage = dir.path().join("store");
        std::fs::write(
            &config_path,
            format!(
                "[storage]\npath = {:?}\n\n[defaults]\ndailyFollowLimit = 25\n",
                storage.display().to_string()
            ),
        )
        .unwrap();

        let app = App::load(Some(&config_path)).await.unwrap();
        app.store.initialize(&app.config.defaults).await.unwrap();
        assert_eq!(app.store.settings().await.unwrap().daily_follow_limit, 25);

        app.queue().enqueue_if_new(vec![UserRecord::new("alice")]).await.unwrap();
        let reopened = App::load(Some(&config_path)).await.unwrap();
        assert_eq!(reopened.queue().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(App::load(Some(&dir.path().join("missing.toml"))).await.is_err());
    }
}
