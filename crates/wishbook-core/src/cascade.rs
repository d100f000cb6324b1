use tracing::{info, warn};
use uuid::Uuid;

use wishbook_types::error::Result;

use crate::{Engine, parse_uuid};

/// Cascade deletion: removing a root entity (message or user) removes every
/// dependent record first, in dependency order, so a dangling dependent with
/// a removed root can never exist. Each step is idempotent — deleting an
/// already-absent dependent is not an error — which makes "all dependents
/// gone, root still present" a safe retry state. Blob deletion is
/// best-effort: a failed blob delete is logged, never fatal.
impl Engine {
    pub(crate) async fn cascade_delete_message(&self, message_id: Uuid) -> Result<()> {
        // Reactions must go before the message row they reference.
        self.db
            .delete_reactions_for_message(&message_id.to_string())?;

        let images = self.db.get_images_for_message(&message_id.to_string())?;
        for img in images {
            let storage_ref = parse_uuid(&img.storage_ref, "image");
            if let Err(e) = self.storage.delete(&storage_ref).await {
                warn!("Image blob {} not deleted: {}", storage_ref, e);
            }
            self.db.delete_upload_row(&img.storage_ref)?;
        }
        self.db.delete_images_for_message(&message_id.to_string())?;

        self.db.delete_message_row(&message_id.to_string())?;
        info!("Cascade removed wish {}", message_id);
        Ok(())
    }

    pub(crate) async fn cascade_delete_user(&self, user_id: Uuid) -> Result<()> {
        // Reactions the user left anywhere, then every owned message with
        // its own dependents (which covers reactions on those messages).
        self.db.delete_reactions_by_user(&user_id.to_string())?;

        let owned = self.db.list_message_ids_by_owner(&user_id.to_string())?;
        for message_id in owned {
            self.cascade_delete_message(parse_uuid(&message_id, "message"))
                .await?;
        }

        // Staged uploads that never got attached to a wish.
        let orphans = self.db.list_upload_refs_by_owner(&user_id.to_string())?;
        for storage_ref in orphans {
            let storage_ref = parse_uuid(&storage_ref, "upload");
            if let Err(e) = self.storage.delete(&storage_ref).await {
                warn!("Orphan blob {} not deleted: {}", storage_ref, e);
            }
            self.db.delete_upload_row(&storage_ref.to_string())?;
        }

        self.db.delete_user_row(&user_id.to_string())?;
        info!("Cascade removed user {}", user_id);
        Ok(())
    }
}
