use thiserror::Error;
use transhub_storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid zoom scale: {0} (must be > 0)")]
    InvalidScale(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Nothing to save: no field is bound to a database column")]
    NothingToSave,

    #[error("Asset unavailable: {0}")]
    AssetUnavailable(String),

    #[error("Parse failure: {0}")]
    ParseFailure(String),

    #[error("Invalid binding: table '{table}' has no column '{column}'")]
    InvalidBinding { table: String, column: String },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Message to show the end user for errors caused by unreadable input.
    ///
    /// Everything else is a caller logic bug and returns `None`.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Error::ParseFailure(_) => Some("file unreadable"),
            Error::AssetUnavailable(_) => Some("reload the document"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
