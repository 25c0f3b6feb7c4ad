use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use crate::types::UpstreamSource;

#[derive(Error, Debug)]
pub enum Error {
    // Client Errors
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Not Found")]
    NotFound,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Upstream Errors
    #[error("{upstream} unavailable (status={status:?}): {reason}")]
    UpstreamUnavailable {
        upstream: UpstreamSource,
        status: Option<u16>,
        reason: String,
    },

    #[error("Malformed {upstream} payload: {details}")]
    UpstreamMalformed {
        upstream: UpstreamSource,
        details: String,
    },

    // Internal Errors
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal classification of a failed request. Success is the `Ok` path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    ClientError,
    ServerError,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Error::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Error::UpstreamMalformed { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidOutput(_)
            | Error::ConfigError(_)
            | Error::MetricsError(_)
            | Error::IoError(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to callers. Never carries upstream bodies or
    /// field-level validation detail.
    pub fn public_message(&self) -> String {
        match self {
            Error::MethodNotAllowed => "Method Not Allowed".to_string(),
            Error::NotFound => "Not Found".to_string(),
            Error::RateLimitExceeded => "Too Many Requests".to_string(),
            Error::UpstreamUnavailable { upstream, status: Some(status), .. } => {
                format!("{} responded with status: {}", upstream, status)
            }
            Error::UpstreamUnavailable { upstream, status: None, .. } => {
                format!("{} is unavailable", upstream)
            }
            Error::UpstreamMalformed { .. } => "Invalid data format".to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.status_code().is_client_error() {
            Outcome::ClientError
        } else {
            Outcome::ServerError
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Error::MethodNotAllowed | Error::NotFound | Error::RateLimitExceeded => {
                tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
            }
            Error::UpstreamUnavailable { .. } | Error::UpstreamMalformed { .. } => {
                tracing::warn!(status = status.as_u16(), "Upstream failure: {}", self);
            }
            _ => {
                tracing::error!(status = status.as_u16(), "Internal failure: {}", self);
            }
        }

        let body = json!({ "error": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}
