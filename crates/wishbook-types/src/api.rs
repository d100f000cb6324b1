use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ImageAttachment, ViewerReactionGroup};

// -- JWT Claims --

/// JWT claims shared across wishbook-api (REST middleware) and
/// wishbook-gateway (WebSocket identification). Canonical definition lives
/// here in wishbook-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

/// Visitor bootstrap: presents a previously saved identity id, if any.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VisitorRequest {
    pub saved_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct VisitorResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub token: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub image_refs: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMessageRequest {
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub image_refs: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub author_name: String,
    pub content: String,
    pub images: Vec<ImageAttachment>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub is_pinned: bool,
    pub owner_user_id: Uuid,
    pub reactions: Vec<ViewerReactionGroup>,
}

#[derive(Debug, Serialize)]
pub struct PinResponse {
    pub id: Uuid,
    pub is_pinned: bool,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionRequest {
    pub emoji: String,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub storage_ref: Uuid,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}
