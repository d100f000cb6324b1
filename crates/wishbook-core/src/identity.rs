use rand::Rng;
use tracing::info;
use uuid::Uuid;

use wishbook_db::models::UserRow;
use wishbook_types::WishbookError;
use wishbook_types::error::Result;
use wishbook_types::models::{Session, User};

use crate::{Engine, parse_db_time, parse_uuid, password};

const NAME_MIN: usize = 3;
const NAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

impl Engine {
    /// Resolve a previously issued identity, or mint a fresh non-admin
    /// visitor. The async gate makes rapid re-entrant bootstrap calls
    /// serialize instead of racing to create duplicates.
    pub async fn get_or_create_visitor(&self, saved_id: Option<Uuid>) -> Result<User> {
        let _gate = self.visitor_gate.lock().await;

        if let Some(id) = saved_id {
            if let Some(row) = self.db.get_user_by_id(&id.to_string())? {
                return Ok(row_to_user(row));
            }
        }

        let id = Uuid::new_v4();
        let display_name = self.free_guest_name()?;

        // Visitors never log in with a password; the row still carries a
        // digest of a random secret so the column stays non-null.
        let mut secret = [0u8; 16];
        rand::rng().fill(&mut secret);
        let digest = password::hash(&hex::encode(secret))?;

        self.db
            .create_user(&id.to_string(), &display_name, &digest, false)?;
        info!("Created visitor identity {} ({})", display_name, id);

        let row = self
            .db
            .get_user_by_id(&id.to_string())?
            .ok_or(WishbookError::NotFound("user"))?;
        Ok(row_to_user(row))
    }

    fn free_guest_name(&self) -> Result<String> {
        for _ in 0..16 {
            let candidate = format!("guest-{:04x}", rand::rng().random_range(0..0x1_0000));
            if self.db.get_user_by_name(&candidate)?.is_none() {
                return Ok(candidate);
            }
        }
        Err(WishbookError::Upstream(anyhow::anyhow!(
            "could not find a free guest name"
        )))
    }

    /// Self-service registration is always non-admin; creating an admin
    /// account requires an already-authenticated admin requester.
    pub async fn register(
        &self,
        requester: Option<&Session>,
        display_name: &str,
        plaintext: &str,
        is_admin: bool,
    ) -> Result<User> {
        if is_admin && !requester.is_some_and(|s| s.is_admin) {
            return Err(WishbookError::Unauthorized);
        }

        let display_name = display_name.trim();
        if display_name.chars().count() < NAME_MIN || display_name.chars().count() > NAME_MAX {
            return Err(WishbookError::validation(format!(
                "display name must be {}..={} characters",
                NAME_MIN, NAME_MAX
            )));
        }
        if plaintext.chars().count() < PASSWORD_MIN {
            return Err(WishbookError::validation(format!(
                "password must be at least {} characters",
                PASSWORD_MIN
            )));
        }
        if self.db.get_user_by_name(display_name)?.is_some() {
            return Err(WishbookError::validation("display name already taken"));
        }

        let id = Uuid::new_v4();
        let digest = password::hash(plaintext)?;
        self.db
            .create_user(&id.to_string(), display_name, &digest, is_admin)?;
        info!("Registered {} (admin: {})", display_name, is_admin);

        let row = self
            .db
            .get_user_by_id(&id.to_string())?
            .ok_or(WishbookError::NotFound("user"))?;
        Ok(row_to_user(row))
    }

    pub async fn verify_login(&self, display_name: &str, plaintext: &str) -> Result<User> {
        let row = self
            .db
            .get_user_by_name(display_name)?
            .ok_or(WishbookError::Unauthorized)?;

        if !password::compare(plaintext, &row.password) {
            return Err(WishbookError::Unauthorized);
        }
        Ok(row_to_user(row))
    }

    pub async fn get_all_users(&self, session: &Session) -> Result<Vec<User>> {
        if !session.is_admin {
            return Err(WishbookError::Unauthorized);
        }
        let rows = self.db.list_users()?;
        Ok(rows.into_iter().map(row_to_user).collect())
    }

    /// Admin-issued account removal. Refuses to take down the last admin,
    /// then runs the full user cascade.
    pub async fn delete_user(&self, session: &Session, target_id: Uuid) -> Result<()> {
        if !session.is_admin {
            return Err(WishbookError::Unauthorized);
        }

        let target = self
            .db
            .get_user_by_id(&target_id.to_string())?
            .ok_or(WishbookError::NotFound("user"))?;

        if target.is_admin && self.db.count_admins()? <= 1 {
            return Err(WishbookError::LastAdminProtected);
        }

        self.cascade_delete_user(target_id).await
    }

    /// First-boot seeding: creates an admin account when none exists, so the
    /// at-least-one-admin invariant holds from the start.
    pub async fn ensure_admin(&self, display_name: &str, plaintext: &str) -> Result<()> {
        if self.db.count_admins()? > 0 {
            return Ok(());
        }
        let id = Uuid::new_v4();
        let digest = password::hash(plaintext)?;
        self.db
            .create_user(&id.to_string(), display_name, &digest, true)?;
        info!("Seeded initial admin {}", display_name);
        Ok(())
    }
}

pub(crate) fn row_to_user(row: UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user"),
        display_name: row.display_name,
        is_admin: row.is_admin,
        created_at: parse_db_time(&row.created_at, "user"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn visitor_bootstrap_resolves_saved_id() {
        let engine = testutil::engine().await;

        let first = engine.get_or_create_visitor(None).await.unwrap();
        assert!(!first.is_admin);

        let again = engine.get_or_create_visitor(Some(first.id)).await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.display_name, first.display_name);
    }

    #[tokio::test]
    async fn stale_saved_id_mints_a_new_identity() {
        let engine = testutil::engine().await;
        let user = engine
            .get_or_create_visitor(Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn admin_creation_requires_admin_requester() {
        let engine = testutil::engine().await;

        let err = engine
            .register(None, "wannabe", "password123", true)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        let visitor = engine.get_or_create_visitor(None).await.unwrap();
        let err = engine
            .register(
                Some(&testutil::session(&visitor)),
                "wannabe",
                "password123",
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        engine.ensure_admin("root", "password123").await.unwrap();
        let admin = engine.verify_login("root", "password123").await.unwrap();
        let made = engine
            .register(
                Some(&testutil::session(&admin)),
                "second-admin",
                "password123",
                true,
            )
            .await
            .unwrap();
        assert!(made.is_admin);
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let engine = testutil::engine().await;
        engine
            .register(None, "alice", "password123", false)
            .await
            .unwrap();

        assert!(engine.verify_login("alice", "password123").await.is_ok());
        let err = engine.verify_login("alice", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));
    }

    #[tokio::test]
    async fn last_admin_is_protected() {
        let engine = testutil::engine().await;
        engine.ensure_admin("root", "password123").await.unwrap();
        let admin = engine.verify_login("root", "password123").await.unwrap();

        let err = engine
            .delete_user(&testutil::session(&admin), admin.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::LastAdminProtected));

        // With a second admin, deleting the first is allowed.
        let other = engine
            .register(
                Some(&testutil::session(&admin)),
                "second-admin",
                "password123",
                true,
            )
            .await
            .unwrap();
        engine
            .delete_user(&testutil::session(&other), admin.id)
            .await
            .unwrap();
        assert!(
            engine
                .db
                .get_user_by_id(&admin.id.to_string())
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn non_admin_cannot_delete_or_list_users() {
        let engine = testutil::engine().await;
        let visitor = engine.get_or_create_visitor(None).await.unwrap();
        let other = engine.get_or_create_visitor(None).await.unwrap();

        let err = engine
            .delete_user(&testutil::session(&visitor), other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));

        let err = engine
            .get_all_users(&testutil::session(&visitor))
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::Unauthorized));
    }
}
