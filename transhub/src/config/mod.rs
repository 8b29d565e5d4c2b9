//! Configuration management for TransHub
//!
//! Default config location: ~/.transhub/config.toml

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use transhub_storage::{BlobStorage, StorageConfig as BackendConfig};

use crate::catalog::ReferenceCatalog;
use crate::editor::{EditorSettings, ZoomRange};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Capacity of the memory backend; unbounded when unset.
    #[serde(default)]
    pub memory_max_mb: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".transhub")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            memory_max_mb: None,
        }
    }
}

impl StorageConfig {
    pub fn backend_config(&self) -> BackendConfig {
        match self.backend {
            StorageBackend::Local => BackendConfig::Local {
                path: self.data_dir.join("data"),
            },
            StorageBackend::Memory => BackendConfig::Memory {
                max_size_bytes: self.memory_max_mb.map(|mb| mb * 1024 * 1024),
            },
        }
    }

    pub fn create_storage(&self) -> Result<Arc<dyn BlobStorage>> {
        let storage = transhub_storage::create_storage(&self.backend_config())
            .map_err(|e| anyhow!("{}", e))?;
        Ok(Arc::from(storage))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CatalogConfig {
    /// YAML catalog file; the built-in catalog when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn load(&self) -> Result<ReferenceCatalog> {
        match &self.path {
            Some(path) => ReferenceCatalog::load(path)
                .with_context(|| format!("Failed to load catalog from {:?}", path)),
            None => Ok(ReferenceCatalog::builtin()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditorConfig {
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f64,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,
    #[serde(default)]
    pub default_table: Option<String>,
}

fn default_zoom_min() -> f64 {
    0.5
}

fn default_zoom_max() -> f64 {
    2.0
}

fn default_zoom_step() -> f64 {
    0.1
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            zoom_step: default_zoom_step(),
            default_zoom: default_zoom(),
            default_table: None,
        }
    }
}

impl EditorConfig {
    pub fn settings(&self) -> Result<EditorSettings> {
        let zoom = ZoomRange::new(self.zoom_min, self.zoom_max, self.zoom_step)
            .map_err(|e| anyhow!("Invalid [editor] zoom range: {}", e))?;
        Ok(EditorSettings {
            zoom,
            default_zoom: self.default_zoom,
            default_table: self.default_table.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter string; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl Config {
    /// Load config from default location (~/.transhub/config.toml)
    pub fn load() -> Result<Self> {
        Self::load_from(&default_data_dir())
    }

    /// Load config from a data directory; missing file means defaults
    pub fn load_from(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");

        let mut config = if config_path.exists() {
            Self::read(&config_path)?
        } else {
            Config::default()
        };

        config.storage.data_dir = data_dir.to_path_buf();
        config.expand_paths()?;
        Ok(config)
    }

    /// Load an explicit config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.expand_paths()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Expand ~ in all paths
    fn expand_paths(&mut self) -> Result<()> {
        self.storage.data_dir = expand_tilde(&self.storage.data_dir)?;
        if let Some(ref p) = self.catalog.path {
            self.catalog.path = Some(expand_tilde(p)?);
        }
        if let Some(ref f) = self.logging.file {
            self.logging.file = Some(expand_tilde(f)?);
        }
        Ok(())
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}
