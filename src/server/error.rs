// ============================================================================
// Erreurs HTTP du backend
// ============================================================================
// Toute erreur devient une réponse JSON {"detail": "..."} avec un status
// ============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::api::wire::ErrorResponse;

/// Erreur renvoyée par un handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    /// 422 : champ multipart absent
    pub fn missing_field(name: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: format!("Field required: {}", name),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, detail = %self.detail, "Request rejected");
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}
