use axum::http::StatusCode;
use thiserror::Error;

/// Every way an inbound ping can be turned down. The display text is the
/// message sent back in the XML envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PingError {
    #[error("Missing required parameter \"{0}\".")]
    MissingParameter(&'static str),
    #[error("{0}")]
    InvalidParameter(String),
    #[error("Too many requests. Try again later.")]
    AbuseBlocked,
    #[error("Entry not found.")]
    NotFound,
    #[error("Entry does not support TrackBack")]
    Forbidden,
    #[error("TrackBack entry exists")]
    Duplicate,
    #[error("{0}")]
    Internal(String),
}

impl PingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PingError::MissingParameter(_) | PingError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            PingError::AbuseBlocked => StatusCode::TOO_MANY_REQUESTS,
            PingError::NotFound => StatusCode::NOT_FOUND,
            PingError::Forbidden => StatusCode::FORBIDDEN,
            PingError::Duplicate => StatusCode::ALREADY_REPORTED,
            PingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller's IP gets the base block for this failure.
    /// Server faults are not the caller's doing, and an abuse hit is
    /// already escalated.
    pub fn applies_base_block(&self) -> bool {
        !matches!(self, PingError::AbuseBlocked | PingError::Internal(_))
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            PingError::MissingParameter(_) => "missing_parameter",
            PingError::InvalidParameter(_) => "invalid_parameter",
            PingError::AbuseBlocked => "abuse_blocked",
            PingError::NotFound => "not_found",
            PingError::Forbidden => "forbidden",
            PingError::Duplicate => "duplicate",
            PingError::Internal(_) => "internal",
        }
    }
}
