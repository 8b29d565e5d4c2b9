//! Selection-to-field engine.
//!
//! Turns raw selection gestures on a rendered page into either "edit this
//! existing field" or "stage a new field here".
//!
//! ```text
//!            empty text
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! Idle ──text──► Selecting ──hit──► EditingExisting
//!                    │
//!                    └──miss──► PendingCreate ──commit──► EditingExisting
//! ```

use tracing::debug;

use crate::coords::{rect_to_document_space, Point, Rect};
use crate::error::Result;
use crate::model::{FieldId, MappingSet};

/// A native selection as reported by the rendering layer, in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSelection {
    pub text: String,
    pub bounds: Rect,
    /// Screen position of the rendered page's top-left corner.
    pub container_origin: Point,
}

impl RawSelection {
    pub fn new(text: impl Into<String>, bounds: Rect, container_origin: Point) -> Self {
        Self {
            text: text.into(),
            bounds,
            container_origin,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Page and zoom the selection was made under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    pub page: u32,
    pub scale: f64,
}

/// Selected text with its document-space rectangle, not yet a field.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSelection {
    pub page: u32,
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting,
    PendingCreate,
    EditingExisting,
}

#[derive(Debug, Default)]
pub struct SelectionEngine {
    state: SelectionState,
    pending: Option<PendingSelection>,
    selected: Option<FieldId>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    pub fn selected(&self) -> Option<&FieldId> {
        self.selected.as_ref()
    }

    /// Run one selection-changed transition.
    ///
    /// An empty selection drops the pending candidate but keeps the selected
    /// field. A scale error leaves the engine in `Selecting` with nothing
    /// pending.
    pub fn on_selection_changed(
        &mut self,
        raw: &RawSelection,
        view: ViewContext,
        fields: &MappingSet,
    ) -> Result<SelectionState> {
        if raw.is_empty() {
            self.pending = None;
            self.state = SelectionState::Idle;
            return Ok(self.state);
        }

        self.state = SelectionState::Selecting;
        self.pending = None;

        let rect = rect_to_document_space(raw.bounds, view.scale, raw.container_origin)?;

        match fields.field_at(view.page, rect.top_left()) {
            Some(hit) => {
                debug!(field = %hit.id, page = view.page, "Selection inside existing field");
                self.selected = Some(hit.id.clone());
                self.state = SelectionState::EditingExisting;
            }
            None => {
                debug!(page = view.page, x = rect.x, y = rect.y, "Staging new field");
                self.pending = Some(PendingSelection {
                    page: view.page,
                    text: raw.text.clone(),
                    rect,
                });
                self.selected = None;
                self.state = SelectionState::PendingCreate;
            }
        }

        Ok(self.state)
    }

    /// Direct selection of an existing field (clicking its overlay).
    pub fn select(&mut self, id: FieldId) {
        self.pending = None;
        self.selected = Some(id);
        self.state = SelectionState::EditingExisting;
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.selected = None;
        self.state = SelectionState::Idle;
    }

    /// Drop the selection if it points at `id`.
    pub fn forget(&mut self, id: &FieldId) {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            if self.state == SelectionState::EditingExisting {
                self.state = SelectionState::Idle;
            }
        }
    }

    /// Hand over the pending selection for commit. Only valid in
    /// `PendingCreate`.
    pub fn take_pending(&mut self) -> Option<PendingSelection> {
        if self.state != SelectionState::PendingCreate {
            return None;
        }
        self.pending.take()
    }
}
