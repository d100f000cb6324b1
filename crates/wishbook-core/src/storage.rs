use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Manages on-disk blob storage for image attachments.
///
/// Each blob is stored as a single flat file at `{dir}/{storage_ref}`.
/// Content type and size live in the uploads table, not on disk.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Path to the blob file for a given storage ref.
    pub fn blob_path(&self, storage_ref: &Uuid) -> PathBuf {
        self.dir.join(storage_ref.to_string())
    }

    /// Public URL a client fetches the blob from.
    pub fn url(&self, storage_ref: &Uuid) -> String {
        format!("/uploads/{}", storage_ref)
    }

    /// Write a blob and return its SHA-256 digest.
    pub async fn put(&self, storage_ref: &Uuid, data: &[u8]) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hex::encode(hasher.finalize());

        fs::write(self.blob_path(storage_ref), data).await?;
        Ok(digest)
    }

    /// Read a blob back. Returns None when the file is absent.
    pub async fn read(&self, storage_ref: &Uuid) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(storage_ref)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Size of the stored blob, if present.
    pub async fn size(&self, storage_ref: &Uuid) -> Result<Option<u64>> {
        match fs::metadata(self.blob_path(storage_ref)).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a blob from disk. An already-absent blob is not an error —
    /// cascade retries must be able to re-run this step.
    pub async fn delete(&self, storage_ref: &Uuid) -> Result<()> {
        match fs::remove_file(self.blob_path(storage_ref)).await {
            Ok(()) => {
                info!("Deleted blob {}", storage_ref);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", storage_ref);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_storage() -> Storage {
        let dir = std::env::temp_dir().join(format!("wishbook-blob-test-{}", Uuid::new_v4()));
        Storage::new(dir).await.unwrap()
    }

    #[tokio::test]
    async fn put_read_delete_round_trip() {
        let storage = temp_storage().await;
        let r = Uuid::new_v4();

        let digest = storage.put(&r, b"png bytes").await.unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(storage.read(&r).await.unwrap().unwrap(), b"png bytes");
        assert_eq!(storage.size(&r).await.unwrap(), Some(9));

        storage.delete(&r).await.unwrap();
        assert!(storage.read(&r).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_absent_blob_is_ok() {
        let storage = temp_storage().await;
        storage.delete(&Uuid::new_v4()).await.unwrap();
    }
}
