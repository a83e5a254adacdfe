//! Error types for the HTTP service.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::valuation::ValuationError;

/// Service errors, rendered as `{success: false, error}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Common(#[from] valuator_common::Error),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Valuation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Common(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Message shown to API clients. Validation messages are passed through
    /// without the error-kind prefix.
    pub fn client_message(&self) -> String {
        match self {
            Self::Common(valuator_common::Error::InvalidInput(msg))
            | Self::Common(valuator_common::Error::NotFound(msg)) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = serde_json::json!({
            "success": false,
            "error": self.client_message(),
        });

        (status, axum::Json(body)).into_response()
    }
}
