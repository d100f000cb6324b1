use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use wishbook_types::WishbookError;

/// Newtype so the engine taxonomy can be returned straight out of handlers.
pub struct ApiError(pub WishbookError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<WishbookError> for ApiError {
    fn from(err: WishbookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            WishbookError::Unauthorized => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            WishbookError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            WishbookError::LastAdminProtected => (StatusCode::CONFLICT, self.0.to_string()),
            WishbookError::ValidationFailed(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            WishbookError::Upstream(e) => {
                error!("Upstream failure: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
