//! Agent error types.

use thiserror::Error;

use followloop_protocols::{PageControl, PageError, StoreError};

/// Errors raised while the agent drives a page.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Shared store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Page automation failure.
    #[error(transparent)]
    Page(#[from] PageError),

    /// The run flag was cleared while an action was in flight.
    #[error("Agent stopped")]
    Stopped,

    /// A control never appeared within the polling budget.
    #[error("Could not find {control} after {attempts} attempts")]
    ControlNotFound { control: PageControl, attempts: u32 },

    /// Handle failed validation.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// The command cannot be honoured in the current state.
    #[error("{0}")]
    Rejected(String),

    /// Extraction was requested on a page without a profile list.
    #[error("Unsupported page for extraction: {0}")]
    UnsupportedPage(String),
}

impl AgentError {
    /// Failures that leave the shared store untouched and count against the
    /// circuit breaker instead of halting the run.
    pub fn is_action_failure(&self) -> bool {
        matches!(
            self,
            AgentError::Page(_) | AgentError::ControlNotFound { .. }
        )
    }
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
