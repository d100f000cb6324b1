use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// The identity a mutation is performed under. Resolved from the session
/// token by the transport layer and passed explicitly into every engine
/// entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub display_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author_name: String,
    pub content: String,
    pub images: Vec<ImageAttachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_pinned: bool,
    pub owner_user_id: Uuid,
}

/// An image blob attached to a message. The blob lives in the disk store
/// under `storage_ref`; the message row owns the attachment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub storage_ref: Uuid,
    pub url: String,
}

/// A validated upload sitting in the blob store, not yet attached to a
/// message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedUpload {
    pub storage_ref: Uuid,
    pub url: String,
    pub size: u64,
    pub content_type: String,
    pub sha256: String,
}

/// Aggregate of all per-user reaction memberships sharing one emoji on one
/// message. `count` is always `reacting_user_ids.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub reacting_user_ids: Vec<Uuid>,
}

/// A reaction group as seen by one viewer: membership collapsed into the
/// `user_reacted` toggle affordance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub user_reacted: bool,
}
