use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            display_name    TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            is_admin        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            author_name     TEXT NOT NULL,
            content         TEXT NOT NULL,
            owner_user_id   TEXT NOT NULL REFERENCES users(id),
            is_pinned       INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            updated_at      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at);

        CREATE TABLE IF NOT EXISTS message_images (
            message_id      TEXT NOT NULL REFERENCES messages(id),
            storage_ref     TEXT NOT NULL,
            url             TEXT NOT NULL,
            position        INTEGER NOT NULL,
            PRIMARY KEY (message_id, position)
        );

        -- One reaction record per (message, user, emoji): the uniqueness
        -- index is the store-level guard, not a check-then-act in the
        -- mutation path.
        CREATE TABLE IF NOT EXISTS reactions (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            emoji       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(message_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON reactions(message_id);

        CREATE INDEX IF NOT EXISTS idx_reactions_user
            ON reactions(user_id);

        CREATE TABLE IF NOT EXISTS uploads (
            storage_ref     TEXT PRIMARY KEY,
            owner_user_id   TEXT NOT NULL REFERENCES users(id),
            content_type    TEXT NOT NULL,
            size            INTEGER NOT NULL,
            sha256          TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
