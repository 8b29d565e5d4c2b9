use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use uuid::Uuid;

use crate::catalog::ReferenceCatalog;
use crate::coords::Rect;
use crate::error::{Error, Result};

/// Opaque field identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Date,
    Number,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Date => write!(f, "date"),
            FieldType::Number => write!(f, "number"),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "date" => Ok(FieldType::Date),
            "number" => Ok(FieldType::Number),
            other => Err(format!("unknown field type '{}'", other)),
        }
    }
}

/// Target table and column. An empty column means "unbound".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Binding {
    pub table_name: String,
    pub column_name: String,
}

impl Binding {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_name: table.into(),
            column_name: column.into(),
        }
    }

    pub fn unbound(table: impl Into<String>) -> Self {
        Self::new(table, "")
    }

    pub fn is_bound(&self) -> bool {
        !self.column_name.is_empty()
    }

    /// `table.column`, or `table.???` while unbound.
    pub fn qualified(&self) -> String {
        if self.is_bound() {
            format!("{}.{}", self.table_name, self.column_name)
        } else {
            format!("{}.???", self.table_name)
        }
    }
}

/// Where a field lives in its source document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// A rectangle on a 1-based PDF page, in document space.
    Region { page: u32, rect: Rect },
    /// A 0-based spreadsheet column.
    Column { index: usize },
}

impl Placement {
    pub fn page(&self) -> Option<u32> {
        match self {
            Placement::Region { page, .. } => Some(*page),
            Placement::Column { .. } => None,
        }
    }

    pub fn rect(&self) -> Option<Rect> {
        match self {
            Placement::Region { rect, .. } => Some(*rect),
            Placement::Column { .. } => None,
        }
    }

    pub fn column_index(&self) -> Option<usize> {
        match self {
            Placement::Column { index } => Some(*index),
            Placement::Region { .. } => None,
        }
    }
}

/// A secondary binding sharing its parent's cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SubField {
    pub id: FieldId,
    pub label: String,
    pub binding: Binding,
    pub field_type: FieldType,
    pub max_length: Option<NonZeroU32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: FieldId,
    pub placement: Placement,
    pub label: String,
    pub binding: Binding,
    pub field_type: FieldType,
    /// Wrap/truncation hint for rendering.
    pub max_length: Option<NonZeroU32>,
    pub sub_fields: Vec<SubField>,
    pub source_selection_text: Option<String>,
}

impl Field {
    /// Bound itself, and every subfield bound too.
    pub fn is_configured(&self) -> bool {
        self.binding.is_bound() && self.sub_fields.iter().all(|s| s.binding.is_bound())
    }

    pub fn page(&self) -> Option<u32> {
        self.placement.page()
    }

    pub fn rect(&self) -> Option<Rect> {
        self.placement.rect()
    }

    pub fn sub_field(&self, id: &FieldId) -> Option<&SubField> {
        self.sub_fields.iter().find(|s| &s.id == id)
    }

    /// Append a subfield labelled "Подполе N" on the parent's table.
    pub fn add_sub_field(&mut self) -> &SubField {
        let label = format!("Подполе {}", self.sub_fields.len() + 1);
        self.sub_fields.push(SubField {
            id: FieldId::generate(),
            label,
            binding: Binding::unbound(self.binding.table_name.clone()),
            field_type: FieldType::Text,
            max_length: None,
        });
        &self.sub_fields[self.sub_fields.len() - 1]
    }

    pub fn remove_sub_field(&mut self, id: &FieldId) -> Result<SubField> {
        let pos = self
            .sub_fields
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| Error::NotFound(format!("subfield {}", id)))?;
        Ok(self.sub_fields.remove(pos))
    }
}

/// New unbound field for a PDF selection.
///
/// The label is the trimmed text; the selection is kept as captured.
pub fn create_field(rect: Rect, page: u32, source_text: &str, default_table: &str) -> Field {
    Field {
        id: FieldId::generate(),
        placement: Placement::Region { page, rect },
        label: source_text.trim().to_string(),
        binding: Binding::unbound(default_table),
        field_type: FieldType::Text,
        max_length: None,
        sub_fields: Vec::new(),
        source_selection_text: Some(source_text.to_string()),
    }
}

/// Unbound seed field for one spreadsheet column.
pub fn create_column_field(index: usize, header: &str, default_table: &str) -> Field {
    Field {
        id: FieldId::generate(),
        placement: Placement::Column { index },
        label: header.to_string(),
        binding: Binding::unbound(default_table),
        field_type: FieldType::Text,
        max_length: None,
        sub_fields: Vec::new(),
        source_selection_text: None,
    }
}

/// Partial update for a field or subfield.
///
/// Switching to a different table resets the column to empty unless the same
/// update names a column, which must then belong to the new table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub label: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub field_type: Option<FieldType>,
    pub max_length: Option<Option<NonZeroU32>>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn bind(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.table(table).column(column)
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Zero clears the hint.
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(NonZeroU32::new(max_length));
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Binding this update would produce, validated against the catalog.
    /// `None` when the update leaves the binding alone.
    fn resolve_binding(
        &self,
        current: &Binding,
        catalog: &ReferenceCatalog,
    ) -> Result<Option<Binding>> {
        if self.table.is_none() && self.column.is_none() {
            return Ok(None);
        }

        let table = self
            .table
            .clone()
            .unwrap_or_else(|| current.table_name.clone());
        let table_changed = table != current.table_name;
        let column = match &self.column {
            Some(c) => c.clone(),
            None if table_changed => String::new(),
            None => current.column_name.clone(),
        };

        if !catalog.is_valid_binding(&table, &column) {
            return Err(Error::InvalidBinding { table, column });
        }

        Ok(Some(Binding::new(table, column)))
    }

    /// Apply to a field. Nothing changes if the binding is rejected.
    pub fn apply_to_field(&self, field: &mut Field, catalog: &ReferenceCatalog) -> Result<()> {
        let binding = self.resolve_binding(&field.binding, catalog)?;
        if let Some(binding) = binding {
            field.binding = binding;
        }
        if let Some(label) = &self.label {
            field.label = label.clone();
        }
        if let Some(field_type) = self.field_type {
            field.field_type = field_type;
        }
        if let Some(max_length) = self.max_length {
            field.max_length = max_length;
        }
        Ok(())
    }

    pub fn apply_to_sub_field(&self, sub: &mut SubField, catalog: &ReferenceCatalog) -> Result<()> {
        let binding = self.resolve_binding(&sub.binding, catalog)?;
        if let Some(binding) = binding {
            sub.binding = binding;
        }
        if let Some(label) = &self.label {
            sub.label = label.clone();
        }
        if let Some(field_type) = self.field_type {
            sub.field_type = field_type;
        }
        if let Some(max_length) = self.max_length {
            sub.max_length = max_length;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Field {
        create_field(Rect::new(10.0, 20.0, 50.0, 10.0), 1, "Иванов", "customers")
    }

    #[test]
    fn test_create_field_defaults() {
        let f = field();
        assert_eq!(f.label, "Иванов");
        assert_eq!(f.binding, Binding::unbound("customers"));
        assert_eq!(f.field_type, FieldType::Text);
        assert!(f.sub_fields.is_empty());
        assert_eq!(f.page(), Some(1));
        assert_eq!(f.source_selection_text.as_deref(), Some("Иванов"));
        assert!(!f.is_configured());
    }

    #[test]
    fn test_selection_text_kept_verbatim() {
        let f = create_field(Rect::new(0.0, 0.0, 5.0, 5.0), 1, "  Иванов\n", "customers");
        assert_eq!(f.label, "Иванов");
        assert_eq!(f.source_selection_text.as_deref(), Some("  Иванов\n"));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(field().id, field().id);
    }

    #[test]
    fn test_table_switch_resets_column() {
        let catalog = ReferenceCatalog::builtin();
        let mut f = field();
        FieldUpdate::new()
            .bind("customers", "inn")
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert_eq!(f.binding, Binding::new("customers", "inn"));

        FieldUpdate::new()
            .table("drivers")
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert_eq!(f.binding, Binding::new("drivers", ""));
    }

    #[test]
    fn test_same_table_keeps_column() {
        let catalog = ReferenceCatalog::builtin();
        let mut f = field();
        FieldUpdate::new()
            .bind("customers", "inn")
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        FieldUpdate::new()
            .table("customers")
            .label("ИНН")
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert_eq!(f.binding, Binding::new("customers", "inn"));
        assert_eq!(f.label, "ИНН");
    }

    #[test]
    fn test_invalid_binding_leaves_field_untouched() {
        let catalog = ReferenceCatalog::builtin();
        let mut f = field();
        let before = f.clone();

        let err = FieldUpdate::new()
            .bind("drivers", "inn")
            .label("x")
            .apply_to_field(&mut f, &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBinding { .. }));

        let err = FieldUpdate::new()
            .table("invoices")
            .apply_to_field(&mut f, &catalog)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBinding { .. }));
        assert_eq!(f, before);
    }

    #[test]
    fn test_max_length_zero_clears() {
        let catalog = ReferenceCatalog::builtin();
        let mut f = field();
        FieldUpdate::new()
            .max_length(40)
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert_eq!(f.max_length, NonZeroU32::new(40));
        FieldUpdate::new()
            .max_length(0)
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert_eq!(f.max_length, None);
    }

    #[test]
    fn test_sub_fields() {
        let catalog = ReferenceCatalog::builtin();
        let mut f = field();
        FieldUpdate::new()
            .bind("drivers", "name")
            .apply_to_field(&mut f, &catalog)
            .unwrap();
        assert!(f.is_configured());

        let first = f.add_sub_field().id.clone();
        let second = f.add_sub_field().id.clone();
        assert_eq!(f.sub_fields[0].label, "Подполе 1");
        assert_eq!(f.sub_fields[1].label, "Подполе 2");
        assert_eq!(f.sub_fields[1].binding, Binding::unbound("drivers"));
        assert!(!f.is_configured());

        f.remove_sub_field(&first).unwrap();
        assert_eq!(f.sub_fields.len(), 1);
        assert!(f.sub_field(&second).is_some());
        assert!(matches!(
            f.remove_sub_field(&first),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_field_type_strings() {
        assert_eq!("date".parse::<FieldType>().unwrap(), FieldType::Date);
        assert!("money".parse::<FieldType>().is_err());
        assert_eq!(FieldType::Number.to_string(), "number");
        assert_eq!(serde_json::to_string(&FieldType::Text).unwrap(), "\"text\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(Binding::new("drivers", "name").qualified(), "drivers.name");
        assert_eq!(Binding::unbound("drivers").qualified(), "drivers.???");
    }
}
