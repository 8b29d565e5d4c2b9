use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::source::sheet::{CsvWorkbookReader, Sheet, Workbook, WorkbookReader};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const BINARY_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Reads xlsx, xlsm, xlsb, xls and ods workbooks, keeping every sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWorkbookReader;

impl WorkbookReader for XlsxWorkbookReader {
    fn read(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| Error::ParseFailure(format!("{}: {}", file_name, e)))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| Error::ParseFailure(format!("sheet '{}': {}", name, e)))?;
            sheets.push(Sheet::new(name, rows_of(&range)));
        }

        debug!(sheets = sheets.len(), "Read binary workbook");
        Ok(Workbook::new(sheets))
    }
}

/// Cell text by row; columns keep their sheet position even when the
/// used range starts to the right of column A.
fn rows_of(range: &Range<Data>) -> Vec<Vec<String>> {
    let offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    range
        .rows()
        .map(|cells| {
            std::iter::repeat(String::new())
                .take(offset)
                .chain(cells.iter().map(|cell| cell.to_string().trim().to_string()))
                .collect()
        })
        .collect()
}

/// Picks the binary reader by magic bytes or extension and CSV otherwise.
#[derive(Debug, Clone, Default)]
pub struct AutoWorkbookReader {
    pub csv: CsvWorkbookReader,
    pub binary: XlsxWorkbookReader,
}

impl AutoWorkbookReader {
    pub fn is_binary(file_name: &str, bytes: &[u8]) -> bool {
        if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) {
            return true;
        }
        Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
    }
}

impl WorkbookReader for AutoWorkbookReader {
    fn read(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook> {
        if Self::is_binary(file_name, bytes) {
            self.binary.read(file_name, bytes)
        } else {
            self.csv.read(file_name, bytes)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::xlsx_bytes;
    use super::*;
    use crate::source::{DocumentSource, SheetSource};

    fn registry() -> Vec<u8> {
        xlsx_bytes(&[
            (
                "Заказы",
                vec![
                    vec!["Номер", "Дата", "Сумма"],
                    vec!["17", "01.02.2025", "1500"],
                    vec!["18", "", "2000"],
                ],
            ),
            (
                "Водители",
                vec![vec!["ФИО", "Телефон"], vec!["Иванов И.И.", "+7 900"]],
            ),
        ])
    }

    #[test]
    fn test_reads_every_sheet() {
        let workbook = XlsxWorkbookReader.read("registry.xlsx", &registry()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Заказы", "Водители"]);
        assert_eq!(workbook.sheets[0].rows[0], vec!["Номер", "Дата", "Сумма"]);
        assert_eq!(workbook.sheets[0].rows[2], vec!["18", "", "2000"]);
    }

    #[test]
    fn test_named_sheet_from_xlsx() {
        let workbook = XlsxWorkbookReader.read("registry.xlsx", &registry()).unwrap();
        let source = SheetSource::new(workbook, Some("Водители")).unwrap();
        assert_eq!(source.headers(), vec!["ФИО", "Телефон"]);
        assert_eq!(source.samples_at(1), vec!["+7 900"]);
        assert_eq!(source.sheet_names(), vec!["Заказы", "Водители"]);
    }

    #[test]
    fn test_leading_empty_columns_keep_position() {
        let bytes = xlsx_bytes(&[("Лист1", vec![vec!["", "Сумма"], vec!["", "10"]])]);
        let workbook = XlsxWorkbookReader.read("x.xlsx", &bytes).unwrap();
        let source = SheetSource::new(workbook, None).unwrap();
        assert_eq!(source.header_at(1).as_deref(), Some("Сумма"));
        assert_eq!(source.samples_at(1), vec!["10"]);
    }

    #[test]
    fn test_corrupt_workbook_is_parse_failure() {
        let err = XlsxWorkbookReader
            .read("broken.xlsx", b"PK\x03\x04 not really a zip")
            .unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_dispatch() {
        assert!(AutoWorkbookReader::is_binary("orders", b"PK\x03\x04rest"));
        assert!(AutoWorkbookReader::is_binary("legacy.bin", OLE_MAGIC));
        assert!(AutoWorkbookReader::is_binary("Реестр.XLSX", b""));
        assert!(!AutoWorkbookReader::is_binary("orders.csv", b"a;b\n1;2\n"));

        let reader = AutoWorkbookReader::default();
        let csv = reader.read("orders.csv", "a;b\n1;2\n".as_bytes()).unwrap();
        assert_eq!(csv.sheet_names(), vec!["orders"]);
        let xlsx = reader.read("upload", &registry()).unwrap();
        assert_eq!(xlsx.sheets.len(), 2);
    }
}
