//! Raw document storage on the local filesystem

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{Error, Result};

/// Stores uploaded file bytes under one directory, keyed by document id.
/// Document metadata lives in the registry, not here.
pub struct DocumentStore {
    storage_dir: PathBuf,
}

impl DocumentStore {
    /// Create a new document store
    pub fn new(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        Ok(Self { storage_dir })
    }

    fn data_path(&self, document_id: &Uuid) -> PathBuf {
        self.storage_dir.join(format!("{}.bin", document_id))
    }

    /// Store a document's raw bytes; returns the storage path
    pub async fn save(&self, document_id: &Uuid, data: &[u8]) -> Result<PathBuf> {
        let path = self.data_path(document_id);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Load a document's raw bytes
    pub async fn load(&self, document_id: &Uuid) -> Result<Vec<u8>> {
        let path = self.data_path(document_id);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::internal(format!("failed to read document {}: {}", document_id, e)))
    }

    /// Whether a document's bytes are stored
    pub async fn exists(&self, document_id: &Uuid) -> bool {
        self.data_path(document_id).exists()
    }

    /// Delete a document's bytes. Deleting an unknown document is a no-op.
    pub async fn delete(&self, document_id: &Uuid) -> Result<()> {
        let path = self.data_path(document_id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().to_path_buf()).unwrap();
        let id = Uuid::new_v4();

        store.save(&id, b"raw bytes").await.unwrap();
        assert!(store.exists(&id).await);
        assert_eq!(store.load(&id).await.unwrap(), b"raw bytes");

        store.delete(&id).await.unwrap();
        assert!(!store.exists(&id).await);
        assert!(store.load(&id).await.is_err());

        // Double delete is a no-op
        store.delete(&id).await.unwrap();
    }
}
