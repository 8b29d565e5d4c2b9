use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{SourceKind, MAX_SAMPLES};
use crate::source::DocumentSource;

/// One named sheet: row 0 is the header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }
}

/// Decodes spreadsheet bytes into a workbook.
///
/// `AutoWorkbookReader` chooses between the CSV and binary readers.
pub trait WorkbookReader: Send + Sync {
    fn read(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook>;
}

/// Reads CSV as a single-sheet workbook.
#[derive(Debug, Clone, Default)]
pub struct CsvWorkbookReader {
    /// `None` sniffs the header line for `,` `;` tab or `|`.
    pub delimiter: Option<u8>,
    /// Defaults to the file stem.
    pub sheet_name: Option<String>,
}

impl CsvWorkbookReader {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
            sheet_name: None,
        }
    }

    fn detect_delimiter(bytes: &[u8]) -> u8 {
        let header = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
        // max_by_key keeps the last maximum, so ',' wins ties
        [b'|', b'\t', b';', b',']
            .into_iter()
            .max_by_key(|d| header.iter().filter(|b| *b == d).count())
            .unwrap_or(b',')
    }
}

impl WorkbookReader for CsvWorkbookReader {
    fn read(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(bytes));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::ParseFailure(format!("csv: {}", e)))?;
            rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }

        let name = self.sheet_name.clone().unwrap_or_else(|| {
            Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Sheet1".to_string())
        });

        debug!(sheet = %name, rows = rows.len(), "Read CSV workbook");
        Ok(Workbook::new(vec![Sheet::new(name, rows)]))
    }
}

/// Column-based source over one sheet of a workbook.
#[derive(Debug, Clone)]
pub struct SheetSource {
    sheet_names: Vec<String>,
    sheet: Sheet,
}

impl SheetSource {
    /// Select `sheet` by name, or the first sheet when `None`.
    pub fn new(workbook: Workbook, sheet: Option<&str>) -> Result<Self> {
        let sheet_names = workbook.sheet_names();
        let selected = match sheet {
            Some(name) => workbook
                .sheets
                .into_iter()
                .find(|s| s.name == name)
                .ok_or_else(|| Error::NotFound(format!("sheet '{}'", name)))?,
            None => workbook
                .sheets
                .into_iter()
                .next()
                .ok_or_else(|| Error::ParseFailure("workbook has no sheets".to_string()))?,
        };

        Ok(Self {
            sheet_names,
            sheet: selected,
        })
    }

    fn header_row(&self) -> &[String] {
        self.sheet.rows.first().map(Vec::as_slice).unwrap_or_default()
    }
}

impl DocumentSource for SheetSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Excel
    }

    fn page_count(&self) -> u32 {
        1
    }

    fn unit_count(&self) -> usize {
        self.header_row().len()
    }

    fn header_at(&self, index: usize) -> Option<String> {
        self.header_row().get(index).cloned()
    }

    /// Up to five non-empty values from the first data rows.
    fn samples_at(&self, index: usize) -> Vec<String> {
        self.sheet
            .rows
            .iter()
            .skip(1)
            .take(MAX_SAMPLES)
            .filter_map(|row| row.get(index))
            .filter(|v| !v.is_empty())
            .cloned()
            .collect()
    }

    fn sheet_name(&self) -> Option<&str> {
        Some(&self.sheet.name)
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheet_names.clone()
    }
}
