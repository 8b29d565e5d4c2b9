//! Durable template record.
//!
//! ```json
//! {
//!   "id": "...", "name": "Договор-заявка", "sourceType": "pdf",
//!   "version": 3, "formatVersion": 1,
//!   "fields": [
//!     { "id": "...", "page": 1, "x": 10, "y": 20, "width": 50, "height": 10,
//!       "label": "Иванов", "tableName": "drivers", "columnName": "name",
//!       "fieldType": "text" }
//!   ]
//! }
//! ```
//!
//! Spreadsheet fields carry `columnIndex` instead of page and geometry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::warn;

use crate::catalog::ReferenceCatalog;
use crate::coords::Rect;
use crate::error::{Error, Result};
use crate::model::{Binding, Field, FieldId, FieldType, MappingSet, Placement, SourceKind, SubField};

pub const FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_type: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_name: Option<String>,
    /// Reserved for compare-and-swap saves.
    #[serde(default)]
    pub version: u64,
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<usize>,
    pub label: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub column_name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<SubFieldRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_selection_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFieldRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub column_name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

/// Plain field-for-field conversion; `updatedAt` is stamped now.
pub fn serialize(set: &MappingSet) -> TemplateRecord {
    TemplateRecord {
        id: set.id.clone(),
        name: set.name.clone(),
        description: set.description.clone(),
        source_type: set.source_kind,
        sheet_name: set.sheet_name.clone(),
        asset_name: set.asset_name.clone(),
        version: set.version,
        format_version: FORMAT_VERSION,
        created_at: set.created_at,
        updated_at: Utc::now(),
        fields: set.fields().iter().map(field_record).collect(),
    }
}

fn field_record(field: &Field) -> FieldRecord {
    let (page, rect, column_index) = match field.placement {
        Placement::Region { page, rect } => (Some(page), Some(rect), None),
        Placement::Column { index } => (None, None, Some(index)),
    };
    FieldRecord {
        id: field.id.to_string(),
        page,
        x: rect.map(|r| r.x),
        y: rect.map(|r| r.y),
        width: rect.map(|r| r.width),
        height: rect.map(|r| r.height),
        column_index,
        label: field.label.clone(),
        table_name: field.binding.table_name.clone(),
        column_name: field.binding.column_name.clone(),
        field_type: field.field_type,
        max_length: field.max_length.map(NonZeroU32::get),
        sub_fields: field.sub_fields.iter().map(sub_field_record).collect(),
        source_selection_text: field.source_selection_text.clone(),
    }
}

fn sub_field_record(sub: &SubField) -> SubFieldRecord {
    SubFieldRecord {
        id: sub.id.to_string(),
        label: sub.label.clone(),
        table_name: sub.binding.table_name.clone(),
        column_name: sub.binding.column_name.clone(),
        field_type: sub.field_type,
        max_length: sub.max_length.map(NonZeroU32::get),
    }
}

/// Rebuild a mapping set. Bindings the catalog does not know are cleared
/// rather than rejected, so templates made against an older catalog still
/// load. Broken geometry is a `ParseFailure`.
pub fn deserialize(record: TemplateRecord, catalog: &ReferenceCatalog) -> Result<MappingSet> {
    if record.format_version > FORMAT_VERSION {
        return Err(Error::ParseFailure(format!(
            "template {} has format version {} (supported: {})",
            record.id, record.format_version, FORMAT_VERSION
        )));
    }

    let mut cleared = 0usize;
    let mut fields = Vec::with_capacity(record.fields.len());

    for f in record.fields {
        let placement = placement(&f, record.source_type)?;

        let mut binding = Binding::new(f.table_name, f.column_name);
        if catalog.sanitize(&mut binding) {
            cleared += 1;
        }

        let mut sub_fields = Vec::with_capacity(f.sub_fields.len());
        for s in f.sub_fields {
            let mut sub_binding = Binding::new(s.table_name, s.column_name);
            if catalog.sanitize(&mut sub_binding) {
                cleared += 1;
            }
            sub_fields.push(SubField {
                id: FieldId::from(s.id),
                label: s.label,
                binding: sub_binding,
                field_type: s.field_type,
                max_length: s.max_length.and_then(NonZeroU32::new),
            });
        }

        fields.push(Field {
            id: FieldId::from(f.id),
            placement,
            label: f.label,
            binding,
            field_type: f.field_type,
            max_length: f.max_length.and_then(NonZeroU32::new),
            sub_fields,
            source_selection_text: f.source_selection_text,
        });
    }

    if cleared > 0 {
        warn!(
            template = %record.id,
            cleared,
            "Cleared bindings unknown to the catalog"
        );
    }

    let mut set = MappingSet::new(record.name, record.source_type).with_id(record.id);
    set.description = record.description;
    set.sheet_name = record.sheet_name;
    set.asset_name = record.asset_name;
    set.version = record.version;
    set.created_at = record.created_at;
    set.replace_fields(fields);
    Ok(set)
}

fn placement(f: &FieldRecord, kind: SourceKind) -> Result<Placement> {
    match kind {
        SourceKind::Excel => f
            .column_index
            .map(|index| Placement::Column { index })
            .ok_or_else(|| Error::ParseFailure(format!("field {} has no columnIndex", f.id))),
        SourceKind::Pdf => {
            let (page, x, y, width, height) = match (f.page, f.x, f.y, f.width, f.height) {
                (Some(p), Some(x), Some(y), Some(w), Some(h)) => (p, x, y, w, h),
                _ => {
                    return Err(Error::ParseFailure(format!(
                        "field {} has incomplete geometry",
                        f.id
                    )))
                }
            };
            let rect = Rect::new(x, y, width, height);
            if page == 0 || !rect.is_committable() {
                return Err(Error::ParseFailure(format!(
                    "field {} has invalid geometry {:?} on page {}",
                    f.id, rect, page
                )));
            }
            Ok(Placement::Region { page, rect })
        }
    }
}
