use thiserror::Error;

/// Errors raised by a [`PageDriver`](crate::PageDriver).
#[derive(Debug, Error)]
pub enum PageError {
    /// Browser protocol failure.
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// Navigation did not complete.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// In-page script raised an exception.
    #[error("Page script error: {0}")]
    Script(String),

    /// The page returned data in an unexpected shape.
    #[error("Unexpected page response: {0}")]
    InvalidResponse(String),

    /// A page operation did not finish in time.
    #[error("Page operation timed out: {0}")]
    Timeout(String),

    /// The page or its session is gone.
    #[error("Page closed")]
    Closed,
}
