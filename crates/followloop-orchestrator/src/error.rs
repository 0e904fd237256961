//! Orchestrator error types.

use thiserror::Error;

use followloop_protocols::ChannelError;

/// Errors raised while preparing pages and relaying commands.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The page is a browser-internal page.
    #[error("Cannot run on browser system pages")]
    SystemPage,

    /// The page is outside the automated site.
    #[error("Please navigate to Twitter/X first")]
    WrongSite,

    /// Scripts were injected but did not report ready.
    #[error("Page scripts not ready on {page}")]
    NotReady { page: String },

    /// Every relay attempt failed with a transient error.
    #[error("Error communicating with Twitter/X page. Please refresh and try again.")]
    RetriesExhausted { command: String, last_error: String },

    /// The page answered but reported failure.
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl OrchestratorError {
    /// Worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            OrchestratorError::NotReady { .. } => true,
            OrchestratorError::Channel(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_message() {
        let err = OrchestratorError::RetriesExhausted {
            command: "startFollowAgent".into(),
            last_error: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "Error communicating with Twitter/X page. Please refresh and try again."
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(OrchestratorError::NotReady { page: "tab".into() }.is_transient());
        assert!(OrchestratorError::Channel(ChannelError::NoReceiver("tab".into())).is_transient());
        assert!(!OrchestratorError::Channel(ChannelError::PageNotFound("tab".into())).is_transient());
        assert!(!OrchestratorError::WrongSite.is_transient());
    }
}
