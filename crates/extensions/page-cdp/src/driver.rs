//! [`PageDriver`] over a CDP page session.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use followloop_protocols::{
    ExtractionPage, FollowProbe, PageControl, PageDriver, PageError, ProfileDraft, ScrollProgress,
};

use crate::cdp::{CdpClient, CdpError, PageSession};
use crate::scripts;

/// Drives one Chrome tab.
pub struct CdpPageDriver {
    // Keeps the WebSocket receive loop alive for the session.
    _client: Arc<CdpClient>,
    session: PageSession,
}

impl CdpPageDriver {
    pub fn new(client: Arc<CdpClient>, session: PageSession) -> Self {
        Self {
            _client: client,
            session,
        }
    }

    /// Attach to tab `target`, or to the first tab whose URL passes `on_site`.
    pub async fn connect<F>(endpoint: &str, target: Option<&str>, on_site: F) -> Result<Self, CdpError>
    where
        F: Fn(&str) -> bool,
    {
        let client = Arc::new(CdpClient::connect(endpoint).await?);
        let target_id = match target {
            Some(id) => id.to_string(),
            None => client.find_page(on_site).await?.id,
        };
        let session = client.attach_page(&target_id).await?;
        info!("Driving tab {}", target_id);
        Ok(Self::new(client, session))
    }

    /// CDP target id of the tab.
    pub fn target_id(&self) -> &str {
        self.session.target_id()
    }
}

#[async_trait]
impl PageDriver for CdpPageDriver {
    async fn current_url(&self) -> Result<String, PageError> {
        scripts::parse(self.session.evaluate(scripts::CURRENT_URL).await?)
    }

    async fn document_id(&self) -> Result<String, PageError> {
        scripts::parse(self.session.evaluate(scripts::DOCUMENT_ID).await?)
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        Ok(self.session.navigate(url).await?)
    }

    async fn probe_follow_state(&self) -> Result<FollowProbe, PageError> {
        scripts::parse_probe(self.session.evaluate(&scripts::probe_follow_state()).await?)
    }

    async fn has_control(&self, control: PageControl) -> Result<bool, PageError> {
        scripts::parse(self.session.evaluate(&scripts::has_control(control)).await?)
    }

    async fn click(&self, control: PageControl) -> Result<bool, PageError> {
        let clicked = scripts::parse(self.session.evaluate(&scripts::click(control)).await?)?;
        debug!("Click on {}: {}", control, clicked);
        Ok(clicked)
    }

    async fn scroll_step(&self, page: ExtractionPage) -> Result<ScrollProgress, PageError> {
        scripts::parse_scroll(self.session.evaluate(&scripts::scroll_step(page)).await?)
    }

    async fn collect_profiles(&self, _page: ExtractionPage) -> Result<Vec<ProfileDraft>, PageError> {
        scripts::parse(self.session.evaluate(&scripts::collect_profiles()).await?)
    }
}
