use shared::{domain::ArticleId, error::ErrorCode};
use thiserror::Error;

/// Failure reported by an [`ArticleService`](crate::ArticleService) call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("server returned {status}: {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed server response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// True when the server rejected the session token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ServiceError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("session expired or missing; log in again")]
    SessionExpired,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("token store failure: {source}")]
    TokenStore { source: anyhow::Error },
    #[error("article {0} is not in the collection")]
    UnknownArticle(ArticleId),
}

impl ControllerError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ControllerError::SessionExpired)
    }
}
