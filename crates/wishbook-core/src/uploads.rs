use tracing::{info, warn};
use uuid::Uuid;

use wishbook_types::WishbookError;
use wishbook_types::error::Result;
use wishbook_types::models::{Session, StagedUpload};

use crate::Engine;

/// Uploads larger than this are rejected and their blobs removed.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

impl Engine {
    /// Accept a direct upload: the blob is written first, then checked
    /// against the size and content-type rules. A rejected blob is removed
    /// from storage before the error surfaces.
    pub async fn stage_upload(
        &self,
        session: &Session,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StagedUpload> {
        if bytes.is_empty() {
            return Err(WishbookError::validation("empty upload"));
        }

        let storage_ref = Uuid::new_v4();
        let sha256 = self.storage.put(&storage_ref, &bytes).await.map_err(WishbookError::Upstream)?;
        let size = bytes.len() as u64;

        if let Err(reason) = check_upload(size, content_type) {
            // The blob never becomes visible; its removal is cleanup, so a
            // failure here is logged and swallowed.
            if let Err(e) = self.storage.delete(&storage_ref).await {
                warn!("Rejected blob {} not deleted: {}", storage_ref, e);
            }
            return Err(WishbookError::ValidationFailed(reason));
        }

        self.db.insert_upload(
            &storage_ref.to_string(),
            &session.user_id.to_string(),
            content_type,
            size as i64,
            &sha256,
        )?;
        info!(
            "{} staged upload {} ({} bytes, {})",
            session.display_name, storage_ref, size, content_type
        );

        Ok(StagedUpload {
            storage_ref,
            url: self.storage.url(&storage_ref),
            size,
            content_type: content_type.to_string(),
            sha256,
        })
    }

    /// URL for a staged upload, or None when the ref is unknown.
    pub async fn upload_url(&self, storage_ref: Uuid) -> Result<Option<String>> {
        Ok(self
            .db
            .get_upload(&storage_ref.to_string())?
            .map(|_| self.storage.url(&storage_ref)))
    }

    /// Blob bytes plus content type, for serving over HTTP.
    pub async fn read_upload(&self, storage_ref: Uuid) -> Result<Option<(String, Vec<u8>)>> {
        let Some(row) = self.db.get_upload(&storage_ref.to_string())? else {
            return Ok(None);
        };
        let Some(bytes) = self
            .storage
            .read(&storage_ref)
            .await
            .map_err(WishbookError::Upstream)?
        else {
            return Ok(None);
        };
        Ok(Some((row.content_type, bytes)))
    }
}

fn check_upload(size: u64, content_type: &str) -> std::result::Result<(), String> {
    if size > MAX_IMAGE_BYTES {
        return Err(format!(
            "image is {} bytes, limit is {}",
            size, MAX_IMAGE_BYTES
        ));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(format!("unsupported content type {}", content_type));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[tokio::test]
    async fn oversized_jpeg_is_rejected_and_blob_removed() {
        let engine = testutil::engine().await;
        let user = engine.get_or_create_visitor(None).await.unwrap();
        let session = testutil::session(&user);

        let err = engine
            .stage_upload(&session, "image/jpeg", vec![0u8; 6 * 1024 * 1024])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::ValidationFailed(_)));

        // Nothing staged, nothing on disk.
        let mut entries = tokio::fs::read_dir(engine.storage.blob_path(&Uuid::new_v4()).parent().unwrap())
            .await
            .unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_content_type_is_rejected_and_blob_removed() {
        let engine = testutil::engine().await;
        let user = engine.get_or_create_visitor(None).await.unwrap();
        let session = testutil::session(&user);

        let err = engine
            .stage_upload(&session, "image/gif", vec![0u8; 2 * 1024 * 1024])
            .await
            .unwrap_err();
        assert!(matches!(err, WishbookError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn valid_png_is_accepted_and_retrievable() {
        let engine = testutil::engine().await;
        let user = engine.get_or_create_visitor(None).await.unwrap();
        let session = testutil::session(&user);

        let staged = engine
            .stage_upload(&session, "image/png", vec![7u8; 2 * 1024 * 1024])
            .await
            .unwrap();
        assert_eq!(staged.size, 2 * 1024 * 1024);

        let url = engine.upload_url(staged.storage_ref).await.unwrap();
        assert_eq!(url, Some(format!("/uploads/{}", staged.storage_ref)));

        let (content_type, bytes) = engine
            .read_upload(staged.storage_ref)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(bytes.len(), 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn unknown_ref_has_no_url() {
        let engine = testutil::engine().await;
        assert!(engine.upload_url(Uuid::new_v4()).await.unwrap().is_none());
    }
}
