//! Field mapping model.
//!
//! Pure data and update operations; no I/O and no notion of "selected".

mod column;
mod field;
mod mapping_set;

pub use column::{column_letter, Column, MAX_SAMPLES};
pub use field::{
    create_column_field, create_field, Binding, Field, FieldId, FieldType, FieldUpdate,
    Placement, SubField,
};
pub use mapping_set::{CompletionStatus, MappingSet, SourceKind};
