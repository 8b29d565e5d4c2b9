//! TransHub template field-mapping editor core.
//!
//! Operators open a PDF or spreadsheet, mark regions (or pick columns) and
//! bind each one to a column of the reference catalog. The resulting mapping
//! set is persisted so documents of the same layout can be filled or
//! extracted automatically.
//!
//! The UI layer drives a [`editor::MappingEditor`] one gesture at a time;
//! document parsing happens in [`loader`] and storage goes through
//! [`persistence::PersistenceAdapter`].

pub mod catalog;
pub mod config;
pub mod coords;
pub mod editor;
pub mod error;
pub mod loader;
pub mod model;
pub mod persistence;
pub mod selection;
pub mod source;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};
