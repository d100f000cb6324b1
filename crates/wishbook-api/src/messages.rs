use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use wishbook_types::api::{
    CreateMessageRequest, MessageResponse, PinResponse, UpdateMessageRequest,
};
use wishbook_types::events::GatewayEvent;
use wishbook_types::models::{Message, Session, ViewerReactionGroup};

use crate::auth::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub pinned_first: bool,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let messages = state
        .engine
        .list_messages(query.pinned_first, session.user_id)
        .await?;

    let body: Vec<MessageResponse> = messages.into_iter().map(to_response).collect();
    Ok(Json(body))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state
        .engine
        .add_message(&session, &req.author_name, &req.content, &req.image_refs)
        .await?;

    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        id: message.id,
        author_name: message.author_name.clone(),
        owner_user_id: message.owner_user_id,
        created_at: message.created_at,
    });

    Ok((StatusCode::CREATED, Json(to_response((message, vec![])))))
}

pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<UpdateMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state
        .engine
        .update_message(&session, id, &req.author_name, &req.content, &req.image_refs)
        .await?;

    state
        .dispatcher
        .broadcast(GatewayEvent::MessageUpdate { id });

    let groups = state.engine.get_reactions(id, session.user_id).await?;
    Ok(Json(to_response((message, groups))))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    state.engine.delete_message(&session, id).await?;

    state
        .dispatcher
        .broadcast(GatewayEvent::MessageDelete { id });

    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_pin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> ApiResult<impl IntoResponse> {
    let is_pinned = state.engine.toggle_pin(&session, id).await?;

    state
        .dispatcher
        .broadcast(GatewayEvent::PinToggle { id, is_pinned });

    Ok(Json(PinResponse { id, is_pinned }))
}

fn to_response((message, reactions): (Message, Vec<ViewerReactionGroup>)) -> MessageResponse {
    MessageResponse {
        id: message.id,
        author_name: message.author_name,
        content: message.content,
        images: message.images,
        created_at: message.created_at,
        updated_at: message.updated_at,
        is_pinned: message.is_pinned,
        owner_user_id: message.owner_user_id,
        reactions,
    }
}
