use thiserror::Error;

/// Failure of a call against the storefront backend.
///
/// Timeouts surface as [`RemoteError::Transport`]; callers treat every
/// variant the same way for rollback purposes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected request with status {status}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Rejected { status: u16, reason: Option<String> },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("api url {0} cannot carry a path")]
    InvalidBaseUrl(url::Url),

    #[error("stock stream closed by server")]
    StreamClosed,
}

impl RemoteError {
    #[must_use]
    pub const fn rejected(status: u16, reason: Option<String>) -> Self {
        Self::Rejected { status, reason }
    }

    /// The machine-readable reason the backend gave, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}
