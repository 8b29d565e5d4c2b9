//! Filesystem backend: one file per object under a data directory.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::ObjectPath;
use crate::traits::{BlobStorage, ObjectMeta};

/// Objects live at `base_path/kind/owner/name`, e.g.
/// `~/.transhub/data/templates/<id>/template.json`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Nothing is created until the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn to_fs_path(&self, path: &ObjectPath) -> PathBuf {
        path.to_path_buf(&self.base_path)
    }

    async fn ensure_parent(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn meta_from(path: ObjectPath, metadata: &std::fs::Metadata) -> ObjectMeta {
        ObjectMeta {
            path,
            size: metadata.len(),
            last_modified: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
        }
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        if path.is_prefix() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let fs_path = self.to_fs_path(path);
        self.ensure_parent(&fs_path).await?;

        debug!("Writing {} bytes to {:?}", data.len(), fs_path);
        fs::write(&fs_path, &data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        let fs_path = self.to_fs_path(path);
        debug!("Reading from {:?}", fs_path);

        match fs::read(&fs_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn exists(&self, path: &ObjectPath) -> Result<bool> {
        let fs_path = self.to_fs_path(path);
        Ok(fs_path.is_file())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &ObjectPath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        debug!("Deleting {:?}", fs_path);

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &ObjectPath) -> Result<Vec<ObjectMeta>> {
        let fs_prefix = self.to_fs_path(prefix);
        let mut results = Vec::new();

        if fs_prefix.is_file() {
            let metadata = fs::metadata(&fs_prefix).await?;
            results.push(Self::meta_from(prefix.clone(), &metadata));
            return Ok(results);
        }

        if !fs_prefix.is_dir() {
            return Ok(results);
        }

        self.list_recursive(&fs_prefix, prefix, &mut results).await?;
        results.sort_by(|a, b| a.path.to_string().cmp(&b.path.to_string()));

        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

impl LocalStorage {
    /// Walk `dir`, collecting every file as an `ObjectPath`.
    #[async_recursion::async_recursion]
    async fn list_recursive(
        &self,
        dir: &std::path::Path,
        prefix: &ObjectPath,
        results: &mut Vec<ObjectMeta>,
    ) -> Result<()> {
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = entry.metadata().await?;

            if metadata.is_dir() {
                self.list_recursive(&path, prefix, results).await?;
            } else if metadata.is_file() {
                let relative = path
                    .strip_prefix(&self.base_path)
                    .map_err(|_| StorageError::InvalidPath(path.display().to_string()))?;
                let path_str = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if let Some(object_path) = ObjectPath::parse(&path_str) {
                    if !object_path.is_prefix() && prefix.covers(&object_path) {
                        results.push(Self::meta_from(object_path, &metadata));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ObjectKind;
    use tempfile::TempDir;

    async fn create_test_storage() -> (LocalStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp.path());
        (storage, temp)
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (storage, _temp) = create_test_storage().await;

        let path = ObjectPath::template("t1", "template.json");
        let data = Bytes::from("{\"id\":\"t1\"}");

        storage.write(&path, data.clone()).await.unwrap();
        let read = storage.read(&path).await.unwrap();

        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (storage, _temp) = create_test_storage().await;

        let err = storage
            .read(&ObjectPath::asset("nope", "source.pdf"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_prefix_rejected() {
        let (storage, _temp) = create_test_storage().await;

        let prefix = ObjectPath::owner_prefix(ObjectKind::Asset, "t1");
        let err = storage.write(&prefix, Bytes::from("x")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (storage, _temp) = create_test_storage().await;
        let path = ObjectPath::asset("t1", "source.pdf");

        assert!(!storage.exists(&path).await.unwrap());
        storage.write(&path, Bytes::from("pdf")).await.unwrap();
        assert!(storage.exists(&path).await.unwrap());

        storage.delete(&path).await.unwrap();
        assert!(!storage.exists(&path).await.unwrap());

        // Deleting again is a no-op
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_by_kind_and_owner() {
        let (storage, _temp) = create_test_storage().await;

        storage
            .write(&ObjectPath::template("a", "template.json"), Bytes::from("1"))
            .await
            .unwrap();
        storage
            .write(&ObjectPath::template("b", "template.json"), Bytes::from("22"))
            .await
            .unwrap();
        storage
            .write(&ObjectPath::asset("a", "source.pdf"), Bytes::from("333"))
            .await
            .unwrap();

        let templates = storage
            .list(&ObjectPath::kind_prefix(ObjectKind::Template))
            .await
            .unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].path.owner, "a");
        assert_eq!(templates[1].path.owner, "b");
        assert_eq!(templates[1].size, 2);

        let owned = storage
            .list(&ObjectPath::owner_prefix(ObjectKind::Asset, "a"))
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].path.name, "source.pdf");
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (storage, _temp) = create_test_storage().await;
        let listed = storage
            .list(&ObjectPath::kind_prefix(ObjectKind::Asset))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_list_reports_size_and_mtime() {
        let (storage, _temp) = create_test_storage().await;
        let path = ObjectPath::asset("a", "source.pdf");
        storage.write(&path, Bytes::from("12345")).await.unwrap();

        let listed = storage.list(&path).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].size, 5);
        assert!(listed[0].last_modified.is_some());
    }
}
