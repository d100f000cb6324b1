use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

use wishbook_types::WishbookError;
use wishbook_types::api::UploadResponse;
use wishbook_types::models::Session;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// POST /uploads — accepts raw image bytes, validates size and content type,
/// returns the storage ref a wish can attach.
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: axum::http::HeaderMap,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError(WishbookError::validation("missing content type")))?
        .to_string();

    let staged = state
        .engine
        .stage_upload(&session, &content_type, bytes.to_vec())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            storage_ref: staged.storage_ref,
            url: staged.url,
            size: staged.size,
            content_type: staged.content_type,
        }),
    ))
}

/// GET /uploads/{storage_ref} — serves the blob back with its stored
/// content type.
pub async fn download(
    State(state): State<AppState>,
    Path(storage_ref): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (content_type, bytes) = state
        .engine
        .read_upload(storage_ref)
        .await?
        .ok_or(ApiError(WishbookError::NotFound("upload")))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
