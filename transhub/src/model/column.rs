use crate::model::field::{Binding, Field, FieldId, FieldType};

/// Maximum number of preview values kept per column.
pub const MAX_SAMPLES: usize = 5;

/// Spreadsheet column letter for a 0-based index: A..Z, AA..ZZ, AAA...
///
/// Bijective base-26, so there is no zero digit.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    letters.into_iter().map(char::from).collect()
}

/// Read-only view of a spreadsheet column and its binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub field_id: FieldId,
    pub index: usize,
    pub letter: String,
    /// Header text from row 0.
    pub header: String,
    pub binding: Binding,
    pub field_type: FieldType,
    pub configured: bool,
    /// Preview only, never persisted.
    pub sample_values: Vec<String>,
}

impl Column {
    /// `None` for fields that are not spreadsheet columns.
    pub fn from_field(field: &Field, header: &str, mut samples: Vec<String>) -> Option<Self> {
        let index = field.placement.column_index()?;
        samples.truncate(MAX_SAMPLES);
        Some(Self {
            field_id: field.id.clone(),
            index,
            letter: column_letter(index),
            header: header.to_string(),
            binding: field.binding.clone(),
            field_type: field.field_type,
            configured: field.is_configured(),
            sample_values: samples,
        })
    }
}
