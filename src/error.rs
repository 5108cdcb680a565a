//! Errors surfaced to callers of the proxy endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Each maps to one HTTP status and a JSON body
/// of the form `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing 'url' query parameter")]
    MissingParameter,

    #[error("Invalid URL format")]
    InvalidUrl(#[source] url::ParseError),

    #[error("Only HTTP or HTTPS protocols are allowed (got '{0}')")]
    DisallowedScheme(String),

    #[error("Failed to reach the upstream site: {0}")]
    UpstreamUnreachable(String),
}

impl ProxyError {
    /// Build an `UpstreamUnreachable` from a transport error, keeping its source chain.
    pub fn upstream(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !detail.ends_with(&text) {
                detail.push_str(": ");
                detail.push_str(&text);
            }
            source = cause.source();
        }
        ProxyError::UpstreamUnreachable(detail)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingParameter => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::DisallowedScheme(_) => StatusCode::FORBIDDEN,
            ProxyError::UpstreamUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingParameter | ProxyError::InvalidUrl(_) | ProxyError::DisallowedScheme(_) => {
                "rejected"
            }
            ProxyError::UpstreamUnreachable(_) => "upstream_error",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
