use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use swoon_core::SwoonError;

/// JSON error body: `{"status": 404, "kind": "not_found", "message": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: msg.into(),
        }
    }
}

impl From<SwoonError> for ApiError {
    fn from(err: SwoonError) -> Self {
        let status = match &err {
            SwoonError::NotFound(_) => StatusCode::NOT_FOUND,
            SwoonError::InvalidReference(_) | SwoonError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            SwoonError::StorageConflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, "{}", self.message);
        }
        let body = serde_json::json!({
            "status": self.status.as_u16(),
            "kind": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
