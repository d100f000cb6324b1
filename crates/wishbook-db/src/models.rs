/// Database row types — these map directly to SQLite rows.
/// Distinct from wishbook-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub password: String,
    pub is_admin: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub author_name: String,
    pub content: String,
    pub owner_user_id: String,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

pub struct ImageRow {
    pub message_id: String,
    pub storage_ref: String,
    pub url: String,
    pub position: i64,
}

pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

pub struct UploadRow {
    pub storage_ref: String,
    pub owner_user_id: String,
    pub content_type: String,
    pub size: i64,
    pub sha256: String,
    pub created_at: String,
}
