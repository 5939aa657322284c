//! HTTP error mapping.
//!
//! # Invariants
//! - Status and body of handler failures come from `ResourceError`; 500s
//!   never carry internal detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docstore_core::ResourceError;
use log::{error, warn};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ApiError {
    Resource(ResourceError),
    /// Path segment is not a UUID; reported as a missing route.
    InvalidId(String),
    /// A previous request panicked while holding the store connection.
    ConnectionPoisoned,
    /// The blocking store task panicked or was cancelled.
    TaskFailed(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource(err) => write!(f, "{err}"),
            Self::InvalidId(raw) => write!(f, "not a valid identifier: `{raw}`"),
            Self::ConnectionPoisoned => f.write_str("store connection lock poisoned"),
            Self::TaskFailed(detail) => write!(f, "store task failed: {detail}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Resource(err) => Some(err),
            Self::InvalidId(_) | Self::ConnectionPoisoned | Self::TaskFailed(_) => None,
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(value: ResourceError) -> Self {
        Self::Resource(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Resource(err) => {
                let status = StatusCode::from_u16(err.status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.body())
            }
            Self::InvalidId(_) => (StatusCode::NOT_FOUND, json!({ "detail": "Not found." })),
            Self::ConnectionPoisoned | Self::TaskFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": "internal server error" }),
            ),
        };

        if status.is_server_error() {
            error!(
                "event=http_request module=http status=error code={} error={}",
                status.as_u16(),
                self
            );
        } else {
            warn!(
                "event=http_request module=http status=rejected code={}",
                status.as_u16()
            );
        }

        (status, Json(body)).into_response()
    }
}
