//! The blob storage seam.
//!
//! Template records and document assets are opaque byte blobs addressed by
//! `ObjectPath`. Backends differ only in durability: the local backend keeps
//! everything, the memory backend may drop entries under pressure.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::path::ObjectPath;

#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub path: ObjectPath,
    pub size: u64,
    /// Seconds since the Unix epoch, when the backend tracks it
    pub last_modified: Option<i64>,
}

/// Shared by the template repository and the asset store, so every
/// implementation is `Send + Sync`. Missing objects are always
/// `StorageError::NotFound`, never a bare I/O error.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `data` at `path`, replacing any previous object.
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()>;

    async fn read(&self, path: &ObjectPath) -> Result<Bytes>;

    async fn exists(&self, path: &ObjectPath) -> Result<bool>;

    /// Deleting a missing object succeeds.
    async fn delete(&self, path: &ObjectPath) -> Result<()>;

    /// Objects covered by `prefix` (see `ObjectPath::covers`).
    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>>;

    /// Remove everything under `prefix`; returns how many objects went.
    async fn delete_prefix(&self, prefix: &ObjectPath) -> Result<usize> {
        let doomed = self.list(prefix).await?;
        for meta in &doomed {
            self.delete(&meta.path).await?;
        }
        Ok(doomed.len())
    }

    /// Short label for logs ("local", "memory").
    fn backend_name(&self) -> &'static str;
}
