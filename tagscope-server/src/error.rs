use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tagscope_core::AdminError;
use tagscope_scanner::ScanError;
use thiserror::Error;
use tracing::error;

/// Errors returned from request handlers. Each maps to a status code and an
/// `{"error": ...}` body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::InvalidUrl(url) => ApiError::BadRequest(format!("Invalid URL: {}", url)),
            ScanError::Upstream { status, body } => ApiError::Upstream {
                status,
                message: format!("Rendering proxy returned {}: {}", status, body),
            },
            ScanError::Timeout(url) => ApiError::Upstream {
                status: StatusCode::GATEWAY_TIMEOUT.as_u16(),
                message: format!("Request to {} timed out", url),
            },
            ScanError::HttpError(e) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Failed to fetch page: {}", e),
            },
            ScanError::Other(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::AuthRejected { status, .. } => ApiError::Upstream {
                status,
                message: "Access token was rejected by Google".to_string(),
            },
            AdminError::Upstream { status, body } => ApiError::Upstream {
                status,
                message: format!("Google Analytics Admin API returned {}: {}", status, body),
            },
            AdminError::InvalidPropertyId(id) => {
                ApiError::BadRequest(format!("Invalid property ID: {}", id))
            }
            AdminError::Http(e) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: format!("Could not reach Google: {}", e),
            },
            AdminError::Decode(e) => ApiError::Internal(e.to_string()),
        }
    }
}
