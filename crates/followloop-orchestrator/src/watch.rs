//! Re-run the handshake whenever a page loads a new document.

use std::future::Future;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use followloop_protocols::ChannelError;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::orchestrator::Orchestrator;

impl Orchestrator {
    /// Guard the URL and run the handshake.
    pub async fn prepare(&self, page: &str) -> OrchestratorResult<()> {
        self.check_page(page).await?;
        self.ensure_ready(page).await
    }

    /// Poll the page's document identity and prepare every new document
    /// until `shutdown` resolves or the page disappears.
    pub async fn watch_page<F>(&self, page: &str, shutdown: F) -> OrchestratorResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.relay.watch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prepared: Option<String> = None;

        info!("Watching page {}", page);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopped watching page {}", page);
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let document = match self.channel.document_id(page).await {
                Ok(document) => document,
                Err(ChannelError::PageNotFound(id)) => {
                    return Err(ChannelError::PageNotFound(id).into());
                }
                Err(e) => {
                    debug!("Could not read document of {}: {}", page, e);
                    continue;
                }
            };
            if prepared.as_deref() == Some(document.as_str()) {
                continue;
            }

            match self.prepare(page).await {
                Ok(()) => {
                    debug!("Prepared document {} on {}", document, page);
                    prepared = Some(document);
                }
                Err(e @ (OrchestratorError::SystemPage | OrchestratorError::WrongSite)) => {
                    debug!("Not preparing {}: {}", page, e);
                    prepared = Some(document);
                }
                Err(e) => warn!("Could not prepare {}: {}", page, e),
            }
        }
    }
}
