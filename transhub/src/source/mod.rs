//! Document sources.
//!
//! The editor only needs a handful of facts about the document it overlays:
//! how many pages there are, and for spreadsheets which columns exist and what
//! their headers and sample values look like. `DocumentSource` is that
//! capability; PDF and spreadsheet inputs are two implementations of it.

mod pdf;
mod sheet;
mod xlsx;

pub use pdf::PdfSource;
pub use sheet::{CsvWorkbookReader, Sheet, SheetSource, Workbook, WorkbookReader};
pub use xlsx::{AutoWorkbookReader, XlsxWorkbookReader};

use bytes::Bytes;
use std::fmt;

use crate::error::Result;
use crate::model::SourceKind;

pub trait DocumentSource: Send + Sync + fmt::Debug {
    fn kind(&self) -> SourceKind;

    /// Number of navigable pages. Spreadsheets have exactly one.
    fn page_count(&self) -> u32;

    /// Pages for PDF, columns for spreadsheets.
    fn unit_count(&self) -> usize;

    /// Header text of column `index`; always `None` for PDF.
    fn header_at(&self, index: usize) -> Option<String>;

    /// Preview values for column `index`.
    fn samples_at(&self, index: usize) -> Vec<String>;

    fn sheet_name(&self) -> Option<&str> {
        None
    }

    fn sheet_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Intrinsic (width, height) of a 1-based page, if known.
    fn page_size(&self, _page: u32) -> Option<(f64, f64)> {
        None
    }

    /// Every detected header, in column order.
    fn headers(&self) -> Vec<String> {
        (0..self.unit_count())
            .filter_map(|i| self.header_at(i))
            .collect()
    }
}

/// A binary document as uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub kind: SourceKind,
    pub file_name: String,
    pub bytes: Bytes,
}

impl Asset {
    pub fn new(kind: SourceKind, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// PDF if the bytes carry the `%PDF-` magic or the name ends in `.pdf`;
    /// anything else is treated as a spreadsheet.
    pub fn detect(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let bytes = bytes.into();
        let is_pdf = bytes.starts_with(b"%PDF-") || file_name.to_lowercase().ends_with(".pdf");
        let kind = if is_pdf {
            SourceKind::Pdf
        } else {
            SourceKind::Excel
        };
        Self {
            kind,
            file_name,
            bytes,
        }
    }
}

/// Parse an asset into a source. `sheet` picks the spreadsheet sheet (first
/// sheet when `None`) and is ignored for PDF.
pub fn parse_asset(
    asset: &Asset,
    sheet: Option<&str>,
    reader: &dyn WorkbookReader,
) -> Result<Box<dyn DocumentSource>> {
    match asset.kind {
        SourceKind::Pdf => Ok(Box::new(PdfSource::from_bytes(&asset.bytes)?)),
        SourceKind::Excel => {
            let workbook = reader.read(&asset.file_name, &asset.bytes)?;
            Ok(Box::new(SheetSource::new(workbook, sheet)?))
        }
    }
}
