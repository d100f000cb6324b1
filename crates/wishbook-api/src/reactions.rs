use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use wishbook_types::api::ReactionRequest;
use wishbook_types::events::GatewayEvent;
use wishbook_types::models::Session;

use crate::auth::AppState;
use crate::error::ApiResult;

pub async fn get_reactions(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let groups = state
        .engine
        .get_reactions(message_id, session.user_id)
        .await?;
    Ok(Json(groups))
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<ReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = state
        .engine
        .add_reaction(&session, message_id, &req.emoji)
        .await?;

    state.dispatcher.broadcast(GatewayEvent::ReactionAdd {
        message_id,
        user_id: session.user_id,
        emoji: req.emoji,
    });

    Ok(Json(group))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<ReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let survivor = state
        .engine
        .remove_reaction(&session, message_id, &req.emoji)
        .await?;

    state.dispatcher.broadcast(GatewayEvent::ReactionRemove {
        message_id,
        user_id: session.user_id,
        emoji: req.emoji,
    });

    Ok(Json(survivor))
}
