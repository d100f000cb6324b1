use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed over the WebSocket gateway. Clients use these to refresh
/// their live message list; the view layer decides whether the refresh is
/// visible immediately or deferred behind a frozen snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful identification
    Ready { user_id: Uuid, display_name: String },

    /// A new wish was posted
    MessageCreate {
        id: Uuid,
        author_name: String,
        owner_user_id: Uuid,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// A wish was edited by its owner
    MessageUpdate { id: Uuid },

    /// A wish was removed (owner self-delete or admin moderation)
    MessageDelete { id: Uuid },

    /// An admin pinned or unpinned a wish
    PinToggle { id: Uuid, is_pinned: bool },

    /// A reaction was added to a wish
    ReactionAdd {
        message_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },

    /// A reaction was removed from a wish
    ReactionRemove {
        message_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
