use crate::Database;
use crate::models::{ImageRow, MessageRow, ReactionRow, UploadRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        display_name: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, password, is_admin) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, display_name, password_hash, is_admin],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_name(&self, display_name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "display_name", display_name))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, password, is_admin, created_at
                 FROM users ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([], map_user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_admins(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE is_admin = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn delete_user_row(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        author_name: &str,
        content: &str,
        owner_user_id: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, author_name, content, owner_user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, author_name, content, owner_user_id, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, author_name, content, owner_user_id, is_pinned, created_at, updated_at
                     FROM messages WHERE id = ?1",
                    [id],
                    map_message_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_message_row(
        &self,
        id: &str,
        author_name: &str,
        content: &str,
        updated_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE messages SET author_name = ?2, content = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![id, author_name, content, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn set_pinned(&self, id: &str, pinned: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE messages SET is_pinned = ?2 WHERE id = ?1",
                rusqlite::params![id, pinned],
            )?;
            Ok(())
        })
    }

    /// All messages ascending by creation time. Pinned-first bucketing is a
    /// stable partition done by the caller, not a SQL comparator.
    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_name, content, owner_user_id, is_pinned, created_at, updated_at
                 FROM messages ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_message_ids_by_owner(&self, owner_user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM messages WHERE owner_user_id = ?1 ORDER BY created_at ASC",
            )?;
            let ids = stmt
                .query_map([owner_user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn delete_message_row(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Images --

    pub fn insert_image(
        &self,
        message_id: &str,
        storage_ref: &str,
        url: &str,
        position: i64,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO message_images (message_id, storage_ref, url, position)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![message_id, storage_ref, url, position],
            )?;
            Ok(())
        })
    }

    pub fn get_images_for_message(&self, message_id: &str) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message_id, storage_ref, url, position
                 FROM message_images WHERE message_id = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map([message_id], map_image_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch image attachments for a set of message IDs.
    pub fn get_images_for_messages(&self, message_ids: &[String]) -> Result<Vec<ImageRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT message_id, storage_ref, url, position
                 FROM message_images WHERE message_id IN ({})
                 ORDER BY message_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), map_image_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_images_for_message(&self, message_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM message_images WHERE message_id = ?1",
                [message_id],
            )?;
            Ok(())
        })
    }

    // -- Reactions --

    /// Insert a reaction membership. Returns false when the (message, user,
    /// emoji) triple already exists — the UNIQUE index absorbs the repeat
    /// instead of a lookup-then-branch.
    pub fn insert_reaction(
        &self,
        id: &str,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO reactions (id, message_id, user_id, emoji)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, message_id, user_id, emoji],
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove a user's membership. Returns false when no such triple existed.
    pub fn delete_reaction(&self, message_id: &str, user_id: &str, emoji: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                rusqlite::params![message_id, user_id, emoji],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_reactions_for_message(&self, message_id: &str) -> Result<Vec<ReactionRow>> {
        self.get_reactions_for_messages(&[message_id.to_string()])
    }

    /// Batch-fetch reactions for a set of message IDs.
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, message_id, user_id, emoji, created_at
                 FROM reactions WHERE message_id IN ({})
                 ORDER BY created_at ASC, id ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_reactions_for_message(&self, message_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM reactions WHERE message_id = ?1", [message_id])?;
            Ok(())
        })
    }

    pub fn delete_reactions_by_user(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM reactions WHERE user_id = ?1", [user_id])?;
            Ok(())
        })
    }

    // -- Uploads --

    pub fn insert_upload(
        &self,
        storage_ref: &str,
        owner_user_id: &str,
        content_type: &str,
        size: i64,
        sha256: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO uploads (storage_ref, owner_user_id, content_type, size, sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![storage_ref, owner_user_id, content_type, size, sha256],
            )?;
            Ok(())
        })
    }

    pub fn get_upload(&self, storage_ref: &str) -> Result<Option<UploadRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT storage_ref, owner_user_id, content_type, size, sha256, created_at
                     FROM uploads WHERE storage_ref = ?1",
                    [storage_ref],
                    |row| {
                        Ok(UploadRow {
                            storage_ref: row.get(0)?,
                            owner_user_id: row.get(1)?,
                            content_type: row.get(2)?,
                            size: row.get(3)?,
                            sha256: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_upload_row(&self, storage_ref: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM uploads WHERE storage_ref = ?1", [storage_ref])?;
            Ok(())
        })
    }

    pub fn list_upload_refs_by_owner(&self, owner_user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT storage_ref FROM uploads WHERE owner_user_id = ?1")?;
            let refs = stmt
                .query_map([owner_user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(refs)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, display_name, password, is_admin, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        password: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        author_name: row.get(1)?,
        content: row.get(2)?,
        owner_user_id: row.get(3)?,
        is_pinned: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_image_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        message_id: row.get(0)?,
        storage_ref: row.get(1)?,
        url: row.get(2)?,
        position: row.get(3)?,
    })
}
