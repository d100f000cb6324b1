use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;

use wishbook_db::models::MessageRow;
use wishbook_types::WishbookError;
use wishbook_types::error::Result;
use wishbook_types::models::{ImageAttachment, Message, Session, ViewerReactionGroup};

use crate::reactions::{aggregate, for_viewer};
use crate::{Engine, now_string, parse_db_time, parse_uuid};

pub const MAX_IMAGES: usize = 3;

impl Engine {
    pub async fn add_message(
        &self,
        session: &Session,
        author_name: &str,
        content: &str,
        image_refs: &[Uuid],
    ) -> Result<Message> {
        validate_fields(author_name, content, image_refs)?;
        let images = self.resolve_images(session, image_refs)?;

        let id = Uuid::new_v4();
        let created_at = now_string();
        self.db.insert_message(
            &id.to_string(),
            author_name.trim(),
            content.trim(),
            &session.user_id.to_string(),
            &created_at,
        )?;
        for (position, img) in images.iter().enumerate() {
            self.db.insert_image(
                &id.to_string(),
                &img.storage_ref.to_string(),
                &img.url,
                position as i64,
            )?;
        }
        info!("{} posted wish {}", session.display_name, id);

        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;
        Ok(row_to_message(row, images))
    }

    /// Only the owner may edit; ownership itself is immutable. Images are
    /// replaced as a set, with dropped blobs cleaned up best-effort.
    pub async fn update_message(
        &self,
        session: &Session,
        id: Uuid,
        author_name: &str,
        content: &str,
        image_refs: &[Uuid],
    ) -> Result<Message> {
        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;
        if row.owner_user_id != session.user_id.to_string() {
            return Err(WishbookError::Unauthorized);
        }

        validate_fields(author_name, content, image_refs)?;
        let images = self.resolve_images(session, image_refs)?;

        let kept: HashSet<&Uuid> = image_refs.iter().collect();
        let old = self.db.get_images_for_message(&id.to_string())?;
        for img in old {
            let storage_ref = parse_uuid(&img.storage_ref, "image");
            if !kept.contains(&storage_ref) {
                if let Err(e) = self.storage.delete(&storage_ref).await {
                    warn!("Dropped image blob {} not deleted: {}", storage_ref, e);
                }
                self.db.delete_upload_row(&img.storage_ref)?;
            }
        }
        self.db.delete_images_for_message(&id.to_string())?;
        for (position, img) in images.iter().enumerate() {
            self.db.insert_image(
                &id.to_string(),
                &img.storage_ref.to_string(),
                &img.url,
                position as i64,
            )?;
        }

        self.db.update_message_row(
            &id.to_string(),
            author_name.trim(),
            content.trim(),
            &now_string(),
        )?;

        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;
        Ok(row_to_message(row, images))
    }

    /// Admin-only. Flips the pin and returns the new value.
    pub async fn toggle_pin(&self, session: &Session, id: Uuid) -> Result<bool> {
        if !session.is_admin {
            return Err(WishbookError::Unauthorized);
        }
        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;

        let pinned = !row.is_pinned;
        self.db.set_pinned(&id.to_string(), pinned)?;
        info!("{} set pin={} on wish {}", session.display_name, pinned, id);
        Ok(pinned)
    }

    /// Owner self-delete and admin moderation share the same cascade; only
    /// the authorization predicate differs.
    pub async fn delete_message(&self, session: &Session, id: Uuid) -> Result<()> {
        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;

        let is_owner = row.owner_user_id == session.user_id.to_string();
        if !is_owner && !session.is_admin {
            return Err(WishbookError::Unauthorized);
        }

        self.cascade_delete_message(id).await
    }

    /// The ordered message list with attachments and reaction groups,
    /// batch-fetched. Pinned-first is a stable two-bucket partition: each
    /// bucket keeps its own chronological order.
    pub async fn list_messages(
        &self,
        pinned_first: bool,
        viewer: Uuid,
    ) -> Result<Vec<(Message, Vec<ViewerReactionGroup>)>> {
        let db = self.db.clone();
        let (rows, image_rows, reaction_rows) = tokio::task::spawn_blocking(move || {
            let rows = db.list_messages()?;
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let image_rows = db.get_images_for_messages(&ids)?;
            let reaction_rows = db.get_reactions_for_messages(&ids)?;
            Ok::<_, anyhow::Error>((rows, image_rows, reaction_rows))
        })
        .await
        .map_err(|e| WishbookError::Upstream(anyhow::anyhow!("join error: {}", e)))??;

        let mut images_by_message: HashMap<String, Vec<ImageAttachment>> = HashMap::new();
        for img in image_rows {
            images_by_message
                .entry(img.message_id.clone())
                .or_default()
                .push(ImageAttachment {
                    storage_ref: parse_uuid(&img.storage_ref, "image"),
                    url: img.url,
                });
        }

        let mut reactions_by_message: HashMap<String, Vec<_>> = HashMap::new();
        for r in reaction_rows {
            reactions_by_message
                .entry(r.message_id.clone())
                .or_default()
                .push(r);
        }

        let messages: Vec<Message> = rows
            .into_iter()
            .map(|row| {
                let images = images_by_message.remove(&row.id).unwrap_or_default();
                row_to_message(row, images)
            })
            .collect();

        let ordered = if pinned_first {
            two_bucket(messages)
        } else {
            messages
        };

        Ok(ordered
            .into_iter()
            .map(|m| {
                let groups = reactions_by_message
                    .remove(&m.id.to_string())
                    .map(|rows| for_viewer(&aggregate(&rows), viewer))
                    .unwrap_or_default();
                (m, groups)
            })
            .collect())
    }

    /// Refs must name uploads staged by the same user — a foreign or unknown
    /// ref reads the same as absent.
    fn resolve_images(&self, session: &Session, image_refs: &[Uuid]) -> Result<Vec<ImageAttachment>> {
        image_refs
            .iter()
            .map(|r| {
                let upload = self
                    .db
                    .get_upload(&r.to_string())?
                    .ok_or_else(|| WishbookError::validation("unknown image reference"))?;
                if upload.owner_user_id != session.user_id.to_string() {
                    return Err(WishbookError::validation("unknown image reference"));
                }
                Ok(ImageAttachment {
                    storage_ref: *r,
                    url: self.storage.url(r),
                })
            })
            .collect()
    }
}

fn validate_fields(author_name: &str, content: &str, image_refs: &[Uuid]) -> Result<()> {
    if author_name.trim().is_empty() {
        return Err(WishbookError::validation("author name must not be empty"));
    }
    if content.trim().is_empty() {
        return Err(WishbookError::validation("content must not be empty"));
    }
    if image_refs.len() > MAX_IMAGES {
        return Err(WishbookError::validation(format!(
            "at most {} images per wish",
            MAX_IMAGES
        )));
    }
    Ok(())
}

/// Stable two-bucket ordering: pinned messages (chronological) ahead of
/// unpinned messages (chronological). Input must already be chronological.
fn two_bucket(messages: Vec<Message>) -> Vec<Message> {
    let (pinned, unpinned): (Vec<_>, Vec<_>) =
        messages.into_iter().partition(|m| m.is_pinned);
    pinned.into_iter().chain(unpinned).collect()
}

pub(crate) fn row_to_message(row: MessageRow, images: Vec<ImageAttachment>) -> Message {
    Message {
        id: parse_uuid(&row.id, "message"),
        author_name: row.author_name,
        content: row.content,
        images,
        created_at: parse_db_time(&row.created_at, "message"),
        updated_at: row.updated_at.map(|t| parse_db_time(&t, "message")),
        is_pinned: row.is_pinned,
        owner_user_id: parse_uuid(&row.owner_user_id, "message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use wishbook_types::models::User;

    async fn visitor(engine: &Engine) -> User {
        engine.get_or_create_visitor(None).await.unwrap()
    }

    /// Insert a message at an explicit timestamp so ordering is exact.
    fn seed_message(engine: &Engine, owner: &User, author: &str, created_at: &str) -> Uuid {
        let id = Uuid::new_v4();
        engine
            .db
            .insert_message(
                &id.to_string(),
                author,
                "hello",
                &owner.id.to_string(),
                created_at,
            )
            .unwrap();
        id
    }

    #[tokio::test]
    async fn add_message_validates_fields() {
        let engine = testutil::engine().await;
        let user = visitor(&engine).await;
        let session = testutil::session(&user);

        let err = engine
            .add_message(&session, "", "hi", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::ValidationFailed(_)));

        let err = engine
            .add_message(&session, "Ana", "   ", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::ValidationFailed(_)));

        let refs = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let err = engine
            .add_message(&session, "Ana", "hi", &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn update_requires_ownership() {
        let engine = testutil::engine().await;
        let owner = visitor(&engine).await;
        let intruder = visitor(&engine).await;

        let msg = engine
            .add_message(&testutil::session(&owner), "Ana", "first", &[])
            .await
            .unwrap();

        let err = engine
            .update_message(&testutil::session(&intruder), msg.id, "Ana", "hacked", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        let updated = engine
            .update_message(&testutil::session(&owner), msg.id, "Ana", "edited", &[])
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.owner_user_id, owner.id);
    }

    #[tokio::test]
    async fn update_unknown_message_is_not_found() {
        let engine = testutil::engine().await;
        let user = visitor(&engine).await;
        let err = engine
            .update_message(&testutil::session(&user), Uuid::new_v4(), "Ana", "x", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::NotFound("message")));
    }

    #[tokio::test]
    async fn pin_is_admin_only_and_toggles() {
        let engine = testutil::engine().await;
        engine.ensure_admin("root", "password123").await.unwrap();
        let admin = engine.verify_login("root", "password123").await.unwrap();
        let user = visitor(&engine).await;

        let msg = engine
            .add_message(&testutil::session(&user), "Ana", "wish", &[])
            .await
            .unwrap();

        let err = engine
            .toggle_pin(&testutil::session(&user), msg.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        assert!(engine.toggle_pin(&testutil::session(&admin), msg.id).await.unwrap());
        assert!(!engine.toggle_pin(&testutil::session(&admin), msg.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_allows_owner_and_admin_only() {
        let engine = testutil::engine().await;
        engine.ensure_admin("root", "password123").await.unwrap();
        let admin = engine.verify_login("root", "password123").await.unwrap();
        let owner = visitor(&engine).await;
        let intruder = visitor(&engine).await;

        let mine = engine
            .add_message(&testutil::session(&owner), "Ana", "mine", &[])
            .await
            .unwrap();
        let theirs = engine
            .add_message(&testutil::session(&owner), "Ana", "theirs", &[])
            .await
            .unwrap();

        let err = engine
            .delete_message(&testutil::session(&intruder), mine.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        engine
            .delete_message(&testutil::session(&owner), mine.id)
            .await
            .unwrap();
        engine
            .delete_message(&testutil::session(&admin), theirs.id)
            .await
            .unwrap();
        assert!(engine.db.get_message(&mine.id.to_string()).unwrap().is_none());
        assert!(engine.db.get_message(&theirs.id.to_string()).unwrap().is_none());
    }

    #[tokio::test]
    async fn ordering_is_a_stable_two_bucket_sort() {
        let engine = testutil::engine().await;
        let user = visitor(&engine).await;

        let t1 = seed_message(&engine, &user, "one", "2026-08-01T10:00:00.000001Z");
        let t2 = seed_message(&engine, &user, "two", "2026-08-01T10:00:00.000002Z");
        let t3 = seed_message(&engine, &user, "three", "2026-08-01T10:00:00.000003Z");
        engine.db.set_pinned(&t2.to_string(), true).unwrap();

        let pinned_first: Vec<Uuid> = engine
            .list_messages(true, user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|(m, _)| m.id)
            .collect();
        assert_eq!(pinned_first, vec![t2, t1, t3]);

        let chronological: Vec<Uuid> = engine
            .list_messages(false, user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|(m, _)| m.id)
            .collect();
        assert_eq!(chronological, vec![t1, t2, t3]);
    }

    #[tokio::test]
    async fn pinned_bucket_keeps_chronological_order() {
        let engine = testutil::engine().await;
        let user = visitor(&engine).await;

        let a = seed_message(&engine, &user, "a", "2026-08-01T10:00:00.000001Z");
        let b = seed_message(&engine, &user, "b", "2026-08-01T10:00:00.000002Z");
        let c = seed_message(&engine, &user, "c", "2026-08-01T10:00:00.000003Z");
        let d = seed_message(&engine, &user, "d", "2026-08-01T10:00:00.000004Z");
        // Pin d before c: pin order must not leak into the bucket order.
        engine.db.set_pinned(&d.to_string(), true).unwrap();
        engine.db.set_pinned(&c.to_string(), true).unwrap();

        let ids: Vec<Uuid> = engine
            .list_messages(true, user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|(m, _)| m.id)
            .collect();
        assert_eq!(ids, vec![c, d, a, b]);
    }
}
