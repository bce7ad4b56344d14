//! Error taxonomy for credential discovery, bootstrap and polling.

use std::path::PathBuf;

/// All errors produced by the presence pipeline.
///
/// Bootstrap retries the recoverable ones (see [`PresenceError::is_retryable`]);
/// the poller absorbs everything per tick.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("lockfile not found at {0}")]
    CredentialsNotFound(PathBuf),

    #[error("cannot access credential directory {path}: {source}")]
    CredentialDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("malformed response: {context}: {details}")]
    MalformedResponse { context: String, details: String },

    #[error("session not loaded yet")]
    SessionNotReady,

    #[error("request failed: {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context} unavailable (HTTP {status})")]
    Unavailable { context: String, status: u16 },

    #[error("{context} rejected credentials (HTTP {status})")]
    Unauthorized { context: String, status: u16 },

    #[error("unknown {kind} identifier: {id}")]
    UnknownIdentifier { kind: &'static str, id: String },
}

impl PresenceError {
    /// Whether a bootstrap step should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PresenceError::SessionNotReady
                | PresenceError::Transport { .. }
                | PresenceError::Unavailable { .. }
        )
    }

    pub(crate) fn malformed(context: impl Into<String>, details: impl ToString) -> Self {
        PresenceError::MalformedResponse {
            context: context.into(),
            details: details.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PresenceError>;
