pub mod cascade;
pub mod identity;
pub mod messages;
pub mod reactions;
pub mod storage;
pub mod uploads;

mod password;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use wishbook_db::Database;

use crate::storage::Storage;

/// The guestbook engine: identity, messages, reactions, uploads and the
/// deletion cascade, over the SQLite store and the disk blob store.
pub struct Engine {
    pub db: Arc<Database>,
    pub storage: Storage,
    /// Single-flight guard for visitor bootstrap — rapid re-entrant calls
    /// from one session must not create duplicate identities.
    visitor_gate: Mutex<()>,
}

impl Engine {
    pub fn new(db: Arc<Database>, storage: Storage) -> Self {
        Self {
            db,
            storage,
            visitor_gate: Mutex::new(()),
        }
    }
}

/// Timestamps are written from Rust with microsecond precision so that
/// lexicographic order in SQLite matches chronological order.
pub(crate) fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_db_time(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite defaults store "YYYY-MM-DD HH:MM:SS" without timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, what, e);
            DateTime::default()
        })
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, what, e);
        Uuid::default()
    })
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Engine over an in-memory database and a throwaway blob directory.
    pub async fn engine() -> Engine {
        let db = Arc::new(Database::open_in_memory().expect("in-memory db"));
        let dir = std::env::temp_dir().join(format!("wishbook-test-{}", Uuid::new_v4()));
        let storage = Storage::new(dir).await.expect("temp storage");
        Engine::new(db, storage)
    }

    pub fn session(user: &wishbook_types::models::User) -> wishbook_types::models::Session {
        wishbook_types::models::Session {
            user_id: user.id,
            display_name: user.display_name.clone(),
            is_admin: user.is_admin,
        }
    }
}
