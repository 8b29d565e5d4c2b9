use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use transhub_storage::{BlobStorage, ObjectKind, ObjectPath, StorageError};

use crate::error::{Error, Result};
use crate::model::SourceKind;
use crate::persistence::record::TemplateRecord;

pub const TEMPLATE_OBJECT: &str = "template.json";

/// Listing entry; avoids handing out whole records.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub source_type: SourceKind,
    pub field_count: usize,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<&TemplateRecord> for TemplateSummary {
    fn from(record: &TemplateRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            source_type: record.source_type,
            field_count: record.fields.len(),
            version: record.version,
            updated_at: record.updated_at,
        }
    }
}

/// Template metadata store.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<TemplateSummary>>;

    /// `Error::NotFound` for unknown ids.
    async fn get(&self, id: &str) -> Result<TemplateRecord>;

    async fn put(&self, record: &TemplateRecord) -> Result<()>;

    /// `Error::NotFound` for unknown ids.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn exists(&self, id: &str) -> Result<bool> {
        match self.get(id).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Ids end up in object paths, so separators and dot segments are refused.
pub(crate) fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(Error::Storage(StorageError::InvalidPath(id.to_string())));
    }
    Ok(())
}

/// JSON records at `templates/<id>/template.json` on any blob backend.
pub struct StorageRepository {
    storage: Arc<dyn BlobStorage>,
}

impl StorageRepository {
    pub fn new(storage: Arc<dyn BlobStorage>) -> Self {
        Self { storage }
    }

    fn path(id: &str) -> Result<ObjectPath> {
        check_id(id)?;
        Ok(ObjectPath::template(id, TEMPLATE_OBJECT))
    }
}

#[async_trait]
impl TemplateRepository for StorageRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<TemplateSummary>> {
        let objects = self
            .storage
            .list(&ObjectPath::kind_prefix(ObjectKind::Template))
            .await?;

        let mut summaries = Vec::new();
        for meta in objects.iter().filter(|m| m.path.name == TEMPLATE_OBJECT) {
            let data = match self.storage.read(&meta.path).await {
                Ok(data) => data,
                // Deleted between list and read
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            };
            match serde_json::from_slice::<TemplateRecord>(&data) {
                Ok(record) => summaries.push(TemplateSummary::from(&record)),
                Err(e) => warn!(path = %meta.path, error = %e, "Skipping unreadable template"),
            }
        }

        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<TemplateRecord> {
        let path = Self::path(id)?;
        let data = self.storage.read(&path).await.map_err(|e| match e {
            StorageError::NotFound(_) => Error::NotFound(format!("template {}", id)),
            other => Error::Storage(other),
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn put(&self, record: &TemplateRecord) -> Result<()> {
        let path = Self::path(&record.id)?;
        let json = serde_json::to_vec_pretty(record)?;
        debug!(bytes = json.len(), "Writing template record");
        self.storage.write(&path, Bytes::from(json)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<()> {
        let path = Self::path(id)?;
        if !self.storage.exists(&path).await? {
            return Err(Error::NotFound(format!("template {}", id)));
        }
        self.storage.delete(&path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MappingSet, SourceKind};
    use crate::persistence::record::serialize;
    use transhub_storage::MemoryStorage;

    fn repo() -> (StorageRepository, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (StorageRepository::new(storage.clone()), storage)
    }

    fn record(id: &str, name: &str) -> TemplateRecord {
        serialize(&MappingSet::new(name, SourceKind::Pdf).with_id(id))
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (repo, _) = repo();
        let r = record("t1", "ТТН");

        repo.put(&r).await.unwrap();
        assert_eq!(repo.get("t1").await.unwrap(), r);
        assert!(repo.exists("t1").await.unwrap());

        repo.delete("t1").await.unwrap();
        assert!(matches!(repo.get("t1").await, Err(Error::NotFound(_))));
        assert!(matches!(repo.delete("t1").await, Err(Error::NotFound(_))));
        assert!(!repo.exists("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sorted_and_skips_garbage() {
        let (repo, storage) = repo();
        repo.put(&record("b", "Договор")).await.unwrap();
        repo.put(&record("a", "Акт")).await.unwrap();
        storage
            .write(
                &ObjectPath::template("broken", TEMPLATE_OBJECT),
                Bytes::from("{not json"),
            )
            .await
            .unwrap();
        storage
            .write(&ObjectPath::asset("a", "source"), Bytes::from("%PDF-"))
            .await
            .unwrap();

        let listed = repo.list().await.unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Акт", "Договор"]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let (repo, _) = repo();
        for id in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                repo.get(id).await,
                Err(Error::Storage(StorageError::InvalidPath(_)))
            ));
        }
    }
}
