use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::ReferenceCatalog;
use crate::coords::{Point, Rect};
use crate::error::{Error, Result};
use crate::model::field::{Field, FieldId, FieldUpdate, SubField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Excel,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pdf => write!(f, "pdf"),
            SourceKind::Excel => write!(f, "excel"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(SourceKind::Pdf),
            "excel" => Ok(SourceKind::Excel),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

/// Configured vs. total fields. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionStatus {
    pub configured_count: usize,
    pub total_count: usize,
}

impl CompletionStatus {
    pub fn is_complete(&self) -> bool {
        self.total_count > 0 && self.configured_count == self.total_count
    }
}

/// Every field of one template plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingSet {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub source_kind: SourceKind,
    /// Active sheet, spreadsheet sources only.
    pub sheet_name: Option<String>,
    pub asset_name: Option<String>,
    /// Bumped on every save.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    fields: Vec<Field>,
}

impl MappingSet {
    pub fn new(name: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            source_kind,
            sheet_name: None,
            asset_name: None,
            version: 0,
            created_at: Utc::now(),
            fields: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == id)
    }

    fn field_mut(&mut self, id: &FieldId) -> Result<&mut Field> {
        self.fields
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| Error::NotFound(format!("field {}", id)))
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Swap the whole field list, e.g. when a new sheet is seeded.
    pub fn replace_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }

    pub fn update_field(
        &mut self,
        id: &FieldId,
        update: &FieldUpdate,
        catalog: &ReferenceCatalog,
    ) -> Result<&Field> {
        let field = self.field_mut(id)?;
        update.apply_to_field(field, catalog)?;
        Ok(&*field)
    }

    pub fn delete_field(&mut self, id: &FieldId) -> Result<Field> {
        let pos = self
            .fields
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| Error::NotFound(format!("field {}", id)))?;
        Ok(self.fields.remove(pos))
    }

    pub fn add_subfield(&mut self, id: &FieldId) -> Result<&SubField> {
        let field = self.field_mut(id)?;
        Ok(field.add_sub_field())
    }

    pub fn update_subfield(
        &mut self,
        field_id: &FieldId,
        sub_id: &FieldId,
        update: &FieldUpdate,
        catalog: &ReferenceCatalog,
    ) -> Result<&SubField> {
        let field = self.field_mut(field_id)?;
        let sub = field
            .sub_fields
            .iter_mut()
            .find(|s| &s.id == sub_id)
            .ok_or_else(|| Error::NotFound(format!("subfield {}", sub_id)))?;
        update.apply_to_sub_field(sub, catalog)?;
        Ok(&*sub)
    }

    pub fn remove_subfield(&mut self, field_id: &FieldId, sub_id: &FieldId) -> Result<SubField> {
        self.field_mut(field_id)?.remove_sub_field(sub_id)
    }

    /// First field on `page` whose rectangle contains `point`, in insertion
    /// order.
    pub fn field_at(&self, page: u32, point: Point) -> Option<&Field> {
        self.fields.iter().find(|f| match f.placement.rect() {
            Some(rect) => f.page() == Some(page) && rect.contains_point(point),
            None => false,
        })
    }

    /// Fields on `page` whose area intersects `rect`.
    pub fn overlapping(&self, page: u32, rect: &Rect) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.page() == Some(page))
            .filter(|f| f.rect().is_some_and(|r| r.intersects(rect)))
            .collect()
    }

    pub fn fields_on_page(&self, page: u32) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.page() == Some(page))
    }

    pub fn completion_status(&self) -> CompletionStatus {
        CompletionStatus {
            configured_count: self.fields.iter().filter(|f| f.is_configured()).count(),
            total_count: self.fields.len(),
        }
    }

    /// Copy holding only fields with a bound top-level column.
    pub fn configured_only(&self) -> MappingSet {
        let mut out = self.clone();
        out.fields.retain(|f| f.binding.is_bound());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::create_field;

    fn set_with_two() -> (MappingSet, FieldId, FieldId) {
        let mut set = MappingSet::new("Договор-заявка", SourceKind::Pdf);
        let a = create_field(Rect::new(10.0, 10.0, 40.0, 10.0), 1, "A", "customers");
        let b = create_field(Rect::new(100.0, 10.0, 40.0, 10.0), 1, "B", "customers");
        let (ida, idb) = (a.id.clone(), b.id.clone());
        set.push(a);
        set.push(b);
        (set, ida, idb)
    }

    #[test]
    fn test_field_at() {
        let (set, a, b) = set_with_two();
        assert_eq!(set.field_at(1, Point::new(20.0, 15.0)).unwrap().id, a);
        assert_eq!(set.field_at(1, Point::new(140.0, 20.0)).unwrap().id, b);
        assert!(set.field_at(1, Point::new(70.0, 15.0)).is_none());
        assert!(set.field_at(2, Point::new(20.0, 15.0)).is_none());
    }

    #[test]
    fn test_field_at_first_match_on_overlap() {
        let (mut set, a, _) = set_with_two();
        set.push(create_field(Rect::new(0.0, 0.0, 60.0, 60.0), 1, "C", "customers"));
        assert_eq!(set.field_at(1, Point::new(20.0, 15.0)).unwrap().id, a);
        assert_eq!(set.overlapping(1, &Rect::new(0.0, 0.0, 60.0, 60.0)).len(), 2);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (mut set, _, _) = set_with_two();
        let catalog = ReferenceCatalog::builtin();
        let missing = FieldId::from("missing");

        assert!(matches!(
            set.update_field(&missing, &FieldUpdate::new().label("x"), &catalog),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(set.delete_field(&missing), Err(Error::NotFound(_))));
        assert!(matches!(set.add_subfield(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_completion_status() {
        let (mut set, a, b) = set_with_two();
        let catalog = ReferenceCatalog::builtin();
        assert_eq!(
            set.completion_status(),
            CompletionStatus {
                configured_count: 0,
                total_count: 2
            }
        );

        set.update_field(&a, &FieldUpdate::new().bind("customers", "name"), &catalog)
            .unwrap();
        assert_eq!(set.completion_status().configured_count, 1);

        let sub = set.add_subfield(&a).unwrap().id.clone();
        assert_eq!(set.completion_status().configured_count, 0);

        set.update_subfield(&a, &sub, &FieldUpdate::new().column("inn"), &catalog)
            .unwrap();
        set.update_field(&b, &FieldUpdate::new().bind("cargo", "weight"), &catalog)
            .unwrap();
        assert!(set.completion_status().is_complete());
    }

    #[test]
    fn test_configured_only() {
        let (mut set, a, b) = set_with_two();
        let catalog = ReferenceCatalog::builtin();
        set.update_field(&a, &FieldUpdate::new().column("inn"), &catalog)
            .unwrap();
        let sub = set.add_subfield(&b).unwrap().id.clone();
        set.update_subfield(&b, &sub, &FieldUpdate::new().column("inn"), &catalog)
            .unwrap();

        let saved = set.configured_only();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.fields()[0].id, a);
    }

    #[test]
    fn test_remove_subfield_normalizes_to_none() {
        let (mut set, a, _) = set_with_two();
        let sub = set.add_subfield(&a).unwrap().id.clone();
        set.remove_subfield(&a, &sub).unwrap();
        assert!(set.field(&a).unwrap().sub_fields.is_empty());
    }
}
