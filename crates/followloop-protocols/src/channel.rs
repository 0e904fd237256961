//! Orchestrator to page-context transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::message::{AgentCommand, CommandResponse};

/// Identifier of a page context (a browser tab).
pub type PageId = String;

/// Scripts injected into a page context, in injection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    /// Answers `ping` and extraction.
    Base,
    /// Hosts the follow agent.
    Agent,
}

impl ScriptKind {
    /// Fixed injection order.
    pub const ORDER: [ScriptKind; 2] = [ScriptKind::Base, ScriptKind::Agent];
}

/// Self-reported readiness flags of a page context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStatus {
    pub base_loaded: bool,
    pub agent_loaded: bool,
}

impl ScriptStatus {
    pub fn is_loaded(&self, script: ScriptKind) -> bool {
        match script {
            ScriptKind::Base => self.base_loaded,
            ScriptKind::Agent => self.agent_loaded,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.base_loaded && self.agent_loaded
    }
}

/// Message transport into page contexts.
///
/// Implementations do not apply deadlines; callers wrap calls in timeouts.
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Deliver a command and await its response.
    async fn send(&self, page: &str, command: AgentCommand) -> Result<CommandResponse, ChannelError>;

    /// Inject a script into the page's current document.
    async fn inject(&self, page: &str, script: ScriptKind) -> Result<(), ChannelError>;

    /// Readiness flags of the page's current document.
    async fn script_status(&self, page: &str) -> Result<ScriptStatus, ChannelError>;

    /// Current URL of the page.
    async fn page_url(&self, page: &str) -> Result<String, ChannelError>;

    /// Identity of the page's current document.
    async fn document_id(&self, page: &str) -> Result<String, ChannelError>;

    /// Point the page at `url` (tab-level navigation).
    async fn navigate(&self, page: &str, url: &str) -> Result<(), ChannelError>;
}
