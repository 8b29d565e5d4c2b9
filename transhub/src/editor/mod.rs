//! Mapping editor controller.
//!
//! One controller for both source kinds. It owns the in-session mapping set,
//! the view state (page, zoom) and the selection engine, and is driven one
//! gesture at a time by the UI layer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use transhub::catalog::ReferenceCatalog;
//! use transhub::editor::{EditorSettings, MappingEditor};
//! use transhub::model::{FieldUpdate, MappingSet, SourceKind};
//! use transhub::source::{Sheet, SheetSource, Workbook};
//!
//! # fn main() -> transhub::Result<()> {
//! let catalog = Arc::new(ReferenceCatalog::builtin());
//! let set = MappingSet::new("Реестр заказов", SourceKind::Excel);
//! let mut editor = MappingEditor::new(set, catalog, EditorSettings::default())?;
//!
//! let workbook = Workbook::new(vec![Sheet::new(
//!     "Лист1",
//!     vec![vec!["Номер".into(), "Дата".into()], vec!["17".into(), "01.02.2025".into()]],
//! )]);
//! editor.load_source(Box::new(SheetSource::new(workbook, None)?))?;
//!
//! editor.select_column(0)?;
//! editor.update_selected_field(&FieldUpdate::new().bind("contracts", "number"))?;
//!
//! let saved = editor.save()?;
//! assert_eq!(saved.len(), 1);
//! # Ok(())
//! # }
//! ```

mod confirm;
mod zoom;

pub use confirm::{ConfirmAction, ConfirmationRequest, ConfirmationResponse, Resolution};
pub use zoom::{EditorSettings, ZoomRange};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::ReferenceCatalog;
use crate::coords::{rect_to_screen_space, Point, Rect};
use crate::error::{Error, Result};
use crate::model::{
    create_column_field, create_field, Column, CompletionStatus, Field, FieldId, FieldUpdate,
    MappingSet, SourceKind, SubField,
};
use crate::selection::{PendingSelection, RawSelection, SelectionEngine, SelectionState, ViewContext};
use crate::source::DocumentSource;

/// A field drawn over the current page, in screen space relative to the
/// page container.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOverlay {
    pub field_id: FieldId,
    pub label: String,
    pub rect: Rect,
    /// Drives the red/green indicator.
    pub configured: bool,
    pub selected: bool,
}

pub struct MappingEditor {
    catalog: Arc<ReferenceCatalog>,
    settings: EditorSettings,
    default_table: String,
    mapping_set: MappingSet,
    source: Option<Box<dyn DocumentSource>>,
    current_page: u32,
    zoom: f64,
    selection: SelectionEngine,
    confirmation: Option<ConfirmationRequest>,
    next_confirmation_id: u64,
}

impl MappingEditor {
    /// Start a session over `mapping_set`, which may be new or loaded.
    pub fn new(
        mapping_set: MappingSet,
        catalog: Arc<ReferenceCatalog>,
        settings: EditorSettings,
    ) -> Result<Self> {
        let default_table = match &settings.default_table {
            Some(name) => catalog
                .table(name)
                .map(|t| t.name.clone())
                .ok_or_else(|| Error::Catalog(format!("unknown default table '{}'", name)))?,
            None => catalog.default_table().name.clone(),
        };
        let zoom = settings.zoom.clamp(settings.default_zoom);

        Ok(Self {
            catalog,
            settings,
            default_table,
            mapping_set,
            source: None,
            current_page: 1,
            zoom,
            selection: SelectionEngine::new(),
            confirmation: None,
            next_confirmation_id: 1,
        })
    }

    pub fn mapping_set(&self) -> &MappingSet {
        &self.mapping_set
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn source(&self) -> Option<&dyn DocumentSource> {
        self.source.as_deref()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Zero until a source is loaded.
    pub fn page_count(&self) -> u32 {
        self.source.as_ref().map_or(0, |s| s.page_count())
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn pending_selection(&self) -> Option<&PendingSelection> {
        self.selection.pending()
    }

    pub fn selected_field(&self) -> Option<&Field> {
        self.selection
            .selected()
            .and_then(|id| self.mapping_set.field(id))
    }

    pub fn pending_confirmation(&self) -> Option<&ConfirmationRequest> {
        self.confirmation.as_ref()
    }

    // ---- source ----

    /// Attach a parsed document. An empty mapping set is seeded with one
    /// unbound field per detected header.
    pub fn load_source(&mut self, source: Box<dyn DocumentSource>) -> Result<()> {
        self.check_kind(&*source)?;

        if self.mapping_set.is_empty() {
            let seed = self.seed_fields(&*source);
            if !seed.is_empty() {
                debug!(columns = seed.len(), "Seeding fields from headers");
            }
            self.mapping_set.replace_fields(seed);
        }
        if source.kind() == SourceKind::Excel {
            self.mapping_set.sheet_name = source.sheet_name().map(str::to_string);
        }

        info!(
            template = %self.mapping_set.id,
            kind = %source.kind(),
            pages = source.page_count(),
            fields = self.mapping_set.len(),
            "Loaded document source"
        );

        self.source = Some(source);
        self.reset_view();
        Ok(())
    }

    /// Replace the spreadsheet with another sheet. Columns differ between
    /// sheets, so the fields are re-seeded.
    pub fn switch_sheet(&mut self, source: Box<dyn DocumentSource>) -> Result<()> {
        if self.mapping_set.source_kind != SourceKind::Excel {
            return Err(Error::InvalidState(
                "sheet switch on a PDF template".to_string(),
            ));
        }
        self.check_kind(&*source)?;

        let seed = self.seed_fields(&*source);
        self.mapping_set.replace_fields(seed);
        self.mapping_set.sheet_name = source.sheet_name().map(str::to_string);

        info!(
            template = %self.mapping_set.id,
            sheet = ?self.mapping_set.sheet_name,
            columns = self.mapping_set.len(),
            "Switched sheet"
        );

        self.source = Some(source);
        self.reset_view();
        Ok(())
    }

    fn check_kind(&self, source: &dyn DocumentSource) -> Result<()> {
        if source.kind() != self.mapping_set.source_kind {
            return Err(Error::InvalidState(format!(
                "{} source for a {} template",
                source.kind(),
                self.mapping_set.source_kind
            )));
        }
        Ok(())
    }

    fn seed_fields(&self, source: &dyn DocumentSource) -> Vec<Field> {
        (0..source.unit_count())
            .filter_map(|i| source.header_at(i).map(|h| (i, h)))
            .map(|(i, header)| create_column_field(i, &header, &self.default_table))
            .collect()
    }

    fn reset_view(&mut self) {
        self.current_page = 1;
        self.selection.clear();
        self.confirmation = None;
    }

    // ---- navigation ----

    pub fn select_page(&mut self, page: u32) -> Result<()> {
        let count = self.page_count();
        if page == 0 || page > count {
            return Err(Error::NotFound(format!("page {} of {}", page, count)));
        }
        self.current_page = page;
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<()> {
        self.select_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> Result<()> {
        self.select_page(self.current_page.saturating_sub(1))
    }

    /// Clamped to the configured range; never fails.
    pub fn set_zoom(&mut self, scale: f64) -> f64 {
        self.zoom = self.settings.zoom.clamp(scale);
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + self.settings.zoom.step())
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - self.settings.zoom.step())
    }

    // ---- selection ----

    pub fn handle_selection_changed(&mut self, raw: &RawSelection) -> Result<SelectionState> {
        if self.mapping_set.source_kind != SourceKind::Pdf {
            return Err(Error::InvalidState(
                "text selection on a spreadsheet template".to_string(),
            ));
        }
        let view = ViewContext {
            page: self.current_page,
            scale: self.zoom,
        };
        self.selection
            .on_selection_changed(raw, view, &self.mapping_set)
    }

    pub fn select_field(&mut self, id: &FieldId) -> Result<&Field> {
        if self.mapping_set.field(id).is_none() {
            return Err(Error::NotFound(format!("field {}", id)));
        }
        self.selection.select(id.clone());
        self.selected()
    }

    pub fn select_column(&mut self, index: usize) -> Result<&Field> {
        let id = self
            .mapping_set
            .fields()
            .iter()
            .find(|f| f.placement.column_index() == Some(index))
            .map(|f| f.id.clone())
            .ok_or_else(|| Error::NotFound(format!("column {}", index)))?;
        self.selection.select(id);
        self.selected()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    fn selected_id(&self) -> Result<FieldId> {
        self.selection
            .selected()
            .cloned()
            .ok_or_else(|| Error::InvalidState("no field selected".to_string()))
    }

    fn selected(&self) -> Result<&Field> {
        let id = self.selected_id()?;
        self.mapping_set
            .field(&id)
            .ok_or_else(|| Error::NotFound(format!("field {}", id)))
    }

    // ---- field operations ----

    /// Turn the pending selection into a new field and select it.
    pub fn commit_pending_field(&mut self) -> Result<&Field> {
        match self.selection.pending() {
            Some(pending) if self.selection.state() == SelectionState::PendingCreate => {
                if !pending.rect.is_committable() {
                    return Err(Error::InvalidState(format!(
                        "selection has no area: {:?}",
                        pending.rect
                    )));
                }
            }
            _ => {
                return Err(Error::InvalidState(
                    "no pending selection to commit".to_string(),
                ))
            }
        }

        let pending = self
            .selection
            .take_pending()
            .ok_or_else(|| Error::InvalidState("no pending selection to commit".to_string()))?;

        let overlaps = self.mapping_set.overlapping(pending.page, &pending.rect);
        if !overlaps.is_empty() {
            warn!(
                page = pending.page,
                overlapping = overlaps.len(),
                "New field overlaps existing fields; hit-testing keeps insertion order"
            );
        }

        let field = create_field(
            pending.rect,
            pending.page,
            &pending.text,
            &self.default_table,
        );
        let id = field.id.clone();
        debug!(field = %id, page = pending.page, "Committed field");

        self.mapping_set.push(field);
        self.selection.select(id);
        self.selected()
    }

    pub fn update_selected_field(&mut self, update: &FieldUpdate) -> Result<&Field> {
        let id = self.selected_id()?;
        self.mapping_set.update_field(&id, update, &self.catalog)
    }

    pub fn delete_selected_field(&mut self) -> Result<Field> {
        let id = self.selected_id()?;
        self.delete_field(&id)
    }

    fn delete_field(&mut self, id: &FieldId) -> Result<Field> {
        let removed = self.mapping_set.delete_field(id)?;
        self.selection.forget(id);
        debug!(field = %id, "Deleted field");
        Ok(removed)
    }

    pub fn add_subfield_to_selected(&mut self) -> Result<&SubField> {
        let id = self.selected_id()?;
        self.mapping_set.add_subfield(&id)
    }

    pub fn update_subfield(&mut self, sub_id: &FieldId, update: &FieldUpdate) -> Result<&SubField> {
        let id = self.selected_id()?;
        self.mapping_set
            .update_subfield(&id, sub_id, update, &self.catalog)
    }

    pub fn remove_subfield(&mut self, sub_id: &FieldId) -> Result<SubField> {
        let id = self.selected_id()?;
        self.mapping_set.remove_subfield(&id, sub_id)
    }

    // ---- confirmations ----

    /// Ask before deleting the selected field. Nothing changes until the
    /// request is resolved.
    pub fn request_delete_selected(&mut self) -> Result<ConfirmationRequest> {
        let field = self.selected()?;
        let message = format!("Удалить поле «{}»?", field.label);
        let action = ConfirmAction::DeleteField {
            field_id: field.id.clone(),
        };
        Ok(self.issue_confirmation(action, message))
    }

    pub fn request_remove_subfield(&mut self, sub_id: &FieldId) -> Result<ConfirmationRequest> {
        let field = self.selected()?;
        let sub = field
            .sub_field(sub_id)
            .ok_or_else(|| Error::NotFound(format!("subfield {}", sub_id)))?;
        let message = format!("Удалить подполе «{}»?", sub.label);
        let action = ConfirmAction::RemoveSubfield {
            field_id: field.id.clone(),
            sub_field_id: sub.id.clone(),
        };
        Ok(self.issue_confirmation(action, message))
    }

    fn issue_confirmation(&mut self, action: ConfirmAction, message: String) -> ConfirmationRequest {
        let request = ConfirmationRequest {
            id: self.next_confirmation_id,
            action,
            message,
        };
        self.next_confirmation_id += 1;
        // A newer request replaces an unanswered one
        self.confirmation = Some(request.clone());
        request
    }

    pub fn resolve(&mut self, response: ConfirmationResponse) -> Result<Resolution> {
        let request = match self.confirmation.take() {
            Some(request) if request.id == response.id => request,
            other => {
                self.confirmation = other;
                return Err(Error::InvalidState(format!(
                    "no pending confirmation {}",
                    response.id
                )));
            }
        };

        if !response.confirmed {
            return Ok(Resolution::Dismissed);
        }

        match &request.action {
            ConfirmAction::DeleteField { field_id } => {
                self.delete_field(field_id)?;
            }
            ConfirmAction::RemoveSubfield {
                field_id,
                sub_field_id,
            } => {
                self.mapping_set.remove_subfield(field_id, sub_field_id)?;
            }
        }
        Ok(Resolution::Applied(request.action))
    }

    // ---- views ----

    pub fn completion_status(&self) -> CompletionStatus {
        self.mapping_set.completion_status()
    }

    /// Fields on the current page at the current zoom.
    pub fn overlays(&self) -> Result<Vec<FieldOverlay>> {
        let selected = self.selection.selected();
        self.mapping_set
            .fields_on_page(self.current_page)
            .filter_map(|f| f.rect().map(|r| (f, r)))
            .map(|(f, rect)| {
                Ok(FieldOverlay {
                    field_id: f.id.clone(),
                    label: f.label.clone(),
                    rect: rect_to_screen_space(rect, self.zoom, Point::ORIGIN)?,
                    configured: f.is_configured(),
                    selected: selected == Some(&f.id),
                })
            })
            .collect()
    }

    /// Spreadsheet columns with headers and samples from the loaded sheet.
    pub fn columns(&self) -> Vec<Column> {
        self.mapping_set
            .fields()
            .iter()
            .filter_map(|f| {
                let index = f.placement.column_index()?;
                let header = self
                    .source
                    .as_ref()
                    .and_then(|s| s.header_at(index))
                    .unwrap_or_else(|| f.label.clone());
                let samples = self
                    .source
                    .as_ref()
                    .map(|s| s.samples_at(index))
                    .unwrap_or_default();
                Column::from_field(f, &header, samples)
            })
            .collect()
    }

    pub fn set_metadata(&mut self, name: impl Into<String>, description: Option<String>) {
        self.mapping_set.name = name.into();
        self.mapping_set.description = description.filter(|d| !d.trim().is_empty());
    }

    /// The set to persist: only fields with a bound top-level column.
    pub fn save(&self) -> Result<MappingSet> {
        let saved = self.mapping_set.configured_only();
        if saved.is_empty() {
            return Err(Error::NothingToSave);
        }
        info!(
            template = %saved.id,
            fields = saved.len(),
            dropped = self.mapping_set.len() - saved.len(),
            "Prepared mapping set for save"
        );
        Ok(saved)
    }

    /// Adopt the version the store assigned, so the next save builds on it.
    pub fn mark_saved(&mut self, saved: &MappingSet) -> Result<()> {
        if saved.id != self.mapping_set.id {
            return Err(Error::InvalidState(format!(
                "saved template {} does not belong to session {}",
                saved.id, self.mapping_set.id
            )));
        }
        self.mapping_set.version = saved.version;
        debug!(template = %saved.id, version = saved.version, "Marked session saved");
        Ok(())
    }
}

impl std::fmt::Debug for MappingEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingEditor")
            .field("template", &self.mapping_set.id)
            .field("fields", &self.mapping_set.len())
            .field("page", &self.current_page)
            .field("zoom", &self.zoom)
            .field("state", &self.selection.state())
            .finish()
    }
}
