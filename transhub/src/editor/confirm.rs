//! Confirmation exchange for destructive actions.
//!
//! The editor never blocks on the user. It hands out a request, and the UI
//! answers later with a response carrying the same id.

use crate::model::FieldId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteField {
        field_id: FieldId,
    },
    RemoveSubfield {
        field_id: FieldId,
        sub_field_id: FieldId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub id: u64,
    pub action: ConfirmAction,
    /// Prompt to show the user.
    pub message: String,
}

impl ConfirmationRequest {
    pub fn confirm(&self) -> ConfirmationResponse {
        ConfirmationResponse {
            id: self.id,
            confirmed: true,
        }
    }

    pub fn dismiss(&self) -> ConfirmationResponse {
        ConfirmationResponse {
            id: self.id,
            confirmed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationResponse {
    pub id: u64,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Applied(ConfirmAction),
    Dismissed,
}
