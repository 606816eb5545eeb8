//! Per-request proxy failures and their HTTP mapping.

use axum::http::header::{ALLOW, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use super::form::FormError;
use crate::error::error_chain;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    BadRequest(#[from] FormError),

    #[error("failed to build upstream request: {source}")]
    Construction {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("upstream request failed: {}", error_chain(&**source))]
    UpstreamUnavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProxyError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Construction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether this failure is on our side (logged) rather than the caller's.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Construction { .. } | Self::UpstreamUnavailable { .. }
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status(),
            [(X_CONTENT_TYPE_OPTIONS, "nosniff")],
            format!("{self}\n"),
        )
            .into_response();
        if matches!(self, Self::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}
