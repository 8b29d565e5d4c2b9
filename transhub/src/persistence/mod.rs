//! Persistence adapter.
//!
//! Template metadata and the binary document asset are stored and addressed
//! independently. Metadata goes through a `TemplateRepository`; assets go to
//! a `BlobStorage` at `assets/<template id>/source`, which may be a bounded
//! cache. A template whose asset has been evicted still loads, and asking for
//! the asset reports `AssetUnavailable` rather than `NotFound`.

mod record;
mod repository;

pub use record::{deserialize, serialize, FieldRecord, SubFieldRecord, TemplateRecord, FORMAT_VERSION};
pub use repository::{StorageRepository, TemplateRepository, TemplateSummary, TEMPLATE_OBJECT};

use std::sync::Arc;
use tracing::{info, instrument};
use transhub_storage::{BlobStorage, ObjectKind, ObjectPath, StorageError};

use crate::catalog::ReferenceCatalog;
use crate::error::{Error, Result};
use crate::model::MappingSet;
use crate::source::Asset;

pub const ASSET_OBJECT: &str = "source";

pub struct PersistenceAdapter {
    repository: Arc<dyn TemplateRepository>,
    assets: Arc<dyn BlobStorage>,
    catalog: Arc<ReferenceCatalog>,
}

impl PersistenceAdapter {
    pub fn new(
        repository: Arc<dyn TemplateRepository>,
        assets: Arc<dyn BlobStorage>,
        catalog: Arc<ReferenceCatalog>,
    ) -> Self {
        Self {
            repository,
            assets,
            catalog,
        }
    }

    /// Metadata and assets on (possibly different) blob backends.
    pub fn from_storage(
        metadata: Arc<dyn BlobStorage>,
        assets: Arc<dyn BlobStorage>,
        catalog: Arc<ReferenceCatalog>,
    ) -> Self {
        Self::new(Arc::new(StorageRepository::new(metadata)), assets, catalog)
    }

    pub fn catalog(&self) -> &Arc<ReferenceCatalog> {
        &self.catalog
    }

    fn asset_path(id: &str) -> Result<ObjectPath> {
        repository::check_id(id)?;
        Ok(ObjectPath::asset(id, ASSET_OBJECT))
    }

    /// Write the whole set as one record and return it with the bumped
    /// version stamp.
    #[instrument(skip(self, set), fields(template = %set.id))]
    pub async fn save(&self, set: &MappingSet) -> Result<MappingSet> {
        let mut saved = set.clone();
        saved.version = set.version + 1;

        let record = serialize(&saved);
        self.repository.put(&record).await?;

        info!(
            version = saved.version,
            fields = saved.len(),
            "Saved template"
        );
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn load(&self, id: &str) -> Result<MappingSet> {
        let record = self.repository.get(id).await?;
        deserialize(record, &self.catalog)
    }

    pub async fn load_record(&self, id: &str) -> Result<TemplateRecord> {
        self.repository.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<TemplateSummary>> {
        self.repository.list().await
    }

    /// Remove the record and any stored asset.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repository.delete(id).await?;
        self.assets
            .delete_prefix(&ObjectPath::owner_prefix(ObjectKind::Asset, id))
            .await?;
        info!("Deleted template");
        Ok(())
    }

    #[instrument(skip(self, asset), fields(file = %asset.file_name, size = asset.bytes.len()))]
    pub async fn put_asset(&self, id: &str, asset: &Asset) -> Result<()> {
        let path = Self::asset_path(id)?;
        self.assets.write(&path, asset.bytes.clone()).await?;
        Ok(())
    }

    /// `NotFound` when the template is unknown, `AssetUnavailable` when the
    /// template exists but its asset is gone.
    #[instrument(skip(self))]
    pub async fn load_asset(&self, id: &str) -> Result<Asset> {
        let record = self.repository.get(id).await?;
        let path = Self::asset_path(id)?;

        let bytes = self.assets.read(&path).await.map_err(|e| match e {
            StorageError::NotFound(_) => Error::AssetUnavailable(id.to_string()),
            other => Error::Storage(other),
        })?;

        let file_name = record
            .asset_name
            .unwrap_or_else(|| ASSET_OBJECT.to_string());
        Ok(Asset::new(record.source_type, file_name, bytes))
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("assets", &self.assets.backend_name())
            .finish()
    }
}
