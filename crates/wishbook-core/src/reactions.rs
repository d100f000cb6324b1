use uuid::Uuid;

use wishbook_db::models::ReactionRow;
use wishbook_types::WishbookError;
use wishbook_types::error::Result;
use wishbook_types::models::{ReactionGroup, Session, ViewerReactionGroup};

use crate::{Engine, parse_uuid};

impl Engine {
    /// Add the session user's membership to an emoji group. A repeat add by
    /// the same user is absorbed by the store's uniqueness index — the count
    /// is derived from membership, so it cannot inflate.
    pub async fn add_reaction(
        &self,
        session: &Session,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<ViewerReactionGroup> {
        if emoji.trim().is_empty() {
            return Err(WishbookError::validation("emoji must not be empty"));
        }
        self.db
            .get_message(&message_id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;

        self.db.insert_reaction(
            &Uuid::new_v4().to_string(),
            &message_id.to_string(),
            &session.user_id.to_string(),
            emoji,
        )?;

        self.group(message_id, emoji, session.user_id)?
            .ok_or(WishbookError::NotFound("reaction"))
    }

    /// Retract the session user's membership. Removing a membership that
    /// does not exist is `NotFound`, never a silent double-decrement.
    /// Returns the surviving group, or None when the last member left.
    pub async fn remove_reaction(
        &self,
        session: &Session,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<Option<ViewerReactionGroup>> {
        let removed = self.db.delete_reaction(
            &message_id.to_string(),
            &session.user_id.to_string(),
            emoji,
        )?;
        if !removed {
            return Err(WishbookError::NotFound("reaction"));
        }

        self.group(message_id, emoji, session.user_id)
    }

    /// All emoji groups on a message as one viewer sees them. Zero-count
    /// groups are never surfaced.
    pub async fn get_reactions(
        &self,
        message_id: Uuid,
        viewer: Uuid,
    ) -> Result<Vec<ViewerReactionGroup>> {
        self.db
            .get_message(&message_id.to_string())?
            .ok_or(WishbookError::NotFound("message"))?;

        let rows = self.db.get_reactions_for_message(&message_id.to_string())?;
        Ok(for_viewer(&aggregate(&rows), viewer))
    }

    fn group(
        &self,
        message_id: Uuid,
        emoji: &str,
        viewer: Uuid,
    ) -> Result<Option<ViewerReactionGroup>> {
        let rows = self.db.get_reactions_for_message(&message_id.to_string())?;
        Ok(for_viewer(&aggregate(&rows), viewer)
            .into_iter()
            .find(|g| g.emoji == emoji))
    }
}

/// Collapse membership rows into per-emoji groups. Group order follows the
/// first reaction seen for each emoji; `count` is always the member count.
pub(crate) fn aggregate(rows: &[ReactionRow]) -> Vec<ReactionGroup> {
    let mut groups: Vec<ReactionGroup> = Vec::new();
    for row in rows {
        let user_id = parse_uuid(&row.user_id, "reaction");
        match groups.iter_mut().find(|g| g.emoji == row.emoji) {
            Some(group) => {
                if !group.reacting_user_ids.contains(&user_id) {
                    group.reacting_user_ids.push(user_id);
                    group.count = group.reacting_user_ids.len();
                }
            }
            None => groups.push(ReactionGroup {
                emoji: row.emoji.clone(),
                count: 1,
                reacting_user_ids: vec![user_id],
            }),
        }
    }
    groups
}

pub(crate) fn for_viewer(groups: &[ReactionGroup], viewer: Uuid) -> Vec<ViewerReactionGroup> {
    groups
        .iter()
        .map(|g| ViewerReactionGroup {
            emoji: g.emoji.clone(),
            count: g.count,
            user_reacted: g.reacting_user_ids.contains(&viewer),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use wishbook_types::models::User;

    async fn setup() -> (Engine, User, Uuid) {
        let engine = testutil::engine().await;
        let user = engine.get_or_create_visitor(None).await.unwrap();
        let msg = engine
            .add_message(&testutil::session(&user), "Ana", "a wish", &[])
            .await
            .unwrap();
        (engine, user, msg.id)
    }

    #[tokio::test]
    async fn add_then_get_round_trip() {
        let (engine, user, message_id) = setup().await;
        let session = testutil::session(&user);

        let before = engine.get_reactions(message_id, user.id).await.unwrap();
        assert!(before.is_empty());

        let group = engine
            .add_reaction(&session, message_id, "🎉")
            .await
            .unwrap();
        assert_eq!(group.count, 1);
        assert!(group.user_reacted);

        let groups = engine.get_reactions(message_id, user.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 1);
        assert!(groups[0].user_reacted);
    }

    #[tokio::test]
    async fn repeat_add_by_same_user_does_not_inflate_count() {
        let (engine, user, message_id) = setup().await;
        let session = testutil::session(&user);

        engine.add_reaction(&session, message_id, "🎉").await.unwrap();
        let group = engine
            .add_reaction(&session, message_id, "🎉")
            .await
            .unwrap();
        assert_eq!(group.count, 1);
    }

    #[tokio::test]
    async fn count_tracks_distinct_members() {
        let (engine, alice, message_id) = setup().await;
        let bob = engine.get_or_create_visitor(None).await.unwrap();

        engine
            .add_reaction(&testutil::session(&alice), message_id, "🎉")
            .await
            .unwrap();
        let group = engine
            .add_reaction(&testutil::session(&bob), message_id, "🎉")
            .await
            .unwrap();
        assert_eq!(group.count, 2);

        // Bob's view toggles, Alice's is independent.
        let bob_view = engine.get_reactions(message_id, bob.id).await.unwrap();
        assert!(bob_view[0].user_reacted);

        let carol = engine.get_or_create_visitor(None).await.unwrap();
        let carol_view = engine.get_reactions(message_id, carol.id).await.unwrap();
        assert!(!carol_view[0].user_reacted);
        assert_eq!(carol_view[0].count, 2);
    }

    #[tokio::test]
    async fn remove_twice_is_not_found() {
        let (engine, user, message_id) = setup().await;
        let session = testutil::session(&user);

        engine.add_reaction(&session, message_id, "🎉").await.unwrap();
        let survivor = engine
            .remove_reaction(&session, message_id, "🎉")
            .await
            .unwrap();
        assert!(survivor.is_none());

        let err = engine
            .remove_reaction(&session, message_id, "🎉")
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::NotFound("reaction")));
    }

    #[tokio::test]
    async fn emptied_group_disappears() {
        let (engine, user, message_id) = setup().await;
        let session = testutil::session(&user);

        engine.add_reaction(&session, message_id, "🎉").await.unwrap();
        engine.remove_reaction(&session, message_id, "🎉").await.unwrap();

        let groups = engine.get_reactions(message_id, user.id).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn reacting_to_missing_message_is_not_found() {
        let (engine, user, _) = setup().await;
        let err = engine
            .add_reaction(&testutil::session(&user), Uuid::new_v4(), "🎉")
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::NotFound("message")));
    }
}
