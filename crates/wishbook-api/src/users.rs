use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use wishbook_types::models::Session;

use crate::auth::AppState;
use crate::error::ApiResult;

/// Admin-only account listing.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let users = state.engine.get_all_users(&session).await?;
    Ok(Json(users))
}

/// Admin-only account removal; cascades through the target's messages,
/// reactions and blobs.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    state.engine.delete_user(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
