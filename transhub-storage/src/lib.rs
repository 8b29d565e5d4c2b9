//! Unified storage abstraction for TransHub.
//!
//! This crate provides the `BlobStorage` trait that the template repository
//! and the document-asset store are written against. Mapping metadata and
//! binary assets are addressed independently, so they can live on different
//! backends (e.g. metadata on disk, assets in a bounded memory cache).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Persistence adapter                        │
//! │  ┌───────────────┐     ┌───────────────┐    │
//! │  │ Template repo │     │  Asset store  │    │
//! │  └───────┬───────┘     └───────┬───────┘    │
//! │          └──────────┬──────────┘            │
//! │                     ▼                       │
//! │            ┌─────────────────┐              │
//! │            │   BlobStorage   │              │
//! │            └────────┬────────┘              │
//! │             ┌───────┴───────┐               │
//! │             ▼               ▼               │
//! │       ┌──────────┐    ┌──────────┐          │
//! │       │  Local   │    │  Memory  │          │
//! │       └──────────┘    └──────────┘          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Object Paths
//!
//! ```text
//! kind/owner/name
//!
//! templates/contract-2025/template.json
//! assets/contract-2025/source.pdf
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use transhub_storage::{BlobStorage, LocalStorage, ObjectKind, ObjectPath};
//! use bytes::Bytes;
//!
//! # async fn example() -> transhub_storage::Result<()> {
//! let storage = LocalStorage::new("./data");
//!
//! let path = ObjectPath::asset("contract-2025", "source.pdf");
//! storage.write(&path, Bytes::from("%PDF-1.7 ...")).await?;
//!
//! let data = storage.read(&path).await?;
//!
//! let all = storage.list(&ObjectPath::kind_prefix(ObjectKind::Asset)).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod local;
mod memory;
mod path;
mod traits;

pub use error::{Result, StorageError};
pub use local::LocalStorage;
pub use memory::{MemoryStats, MemoryStorage};
pub use path::{ObjectKind, ObjectPath};
pub use traits::{BlobStorage, ObjectMeta};

// Re-export bytes for convenience
pub use bytes::Bytes;

/// Create a storage backend from configuration.
pub fn create_storage(config: &StorageConfig) -> Result<Box<dyn BlobStorage>> {
    match config {
        StorageConfig::Local { path } => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::Config(
                    "Local storage requires a data directory".to_string(),
                ));
            }
            Ok(Box::new(LocalStorage::new(path)))
        }
        StorageConfig::Memory { max_size_bytes } => Ok(match max_size_bytes {
            Some(max) => Box::new(MemoryStorage::with_capacity(*max)),
            None => Box::new(MemoryStorage::new()),
        }),
    }
}

/// Storage configuration enum.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local filesystem storage
    Local {
        /// Base path for data
        path: std::path::PathBuf,
    },
    /// Process-local storage, optionally bounded
    Memory {
        /// Capacity in bytes; `None` for unbounded
        max_size_bytes: Option<u64>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            path: std::path::PathBuf::from("./data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_storage_backends() {
        let local = create_storage(&StorageConfig::default()).unwrap();
        assert_eq!(local.backend_name(), "local");

        let memory = create_storage(&StorageConfig::Memory {
            max_size_bytes: Some(1024),
        })
        .unwrap();
        assert_eq!(memory.backend_name(), "memory");
    }

    #[test]
    fn test_create_storage_rejects_empty_path() {
        let result = create_storage(&StorageConfig::Local {
            path: std::path::PathBuf::new(),
        });
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
