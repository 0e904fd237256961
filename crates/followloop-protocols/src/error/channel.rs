use thiserror::Error;

use super::page::PageError;

/// Errors raised while talking to a page context.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No script is listening in the page context.
    #[error("Could not establish connection. Receiving end does not exist: {0}")]
    NoReceiver(String),

    /// The page context did not answer in time.
    #[error("Timed out waiting for '{command}' after {after_ms}ms")]
    Timeout { command: String, after_ms: u64 },

    /// A script could not be injected.
    #[error("Script injection failed: {0}")]
    Injection(String),

    /// The addressed page is unknown.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Failure from the page automation layer.
    #[error(transparent)]
    Page(#[from] PageError),
}

impl ChannelError {
    /// Transient failures are worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChannelError::NoReceiver(_) | ChannelError::Timeout { .. } | ChannelError::Injection(_)
        )
    }
}
