//! Reference table catalog.
//!
//! The fixed set of database tables (and their columns) a field may be bound
//! to. Loaded once at startup and shared immutably for the whole session.
//!
//! A catalog file is YAML:
//!
//! ```yaml
//! tables:
//!   - name: customers
//!     label: Заказчики
//!     columns: [name, inn, ogrn]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::Binding;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub name: String,
    pub label: String,
    pub columns: Vec<String>,
}

impl CatalogTable {
    fn new(name: &str, label: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    tables: Vec<CatalogTable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCatalog {
    tables: Vec<CatalogTable>,
}

impl ReferenceCatalog {
    /// Validated catalog. Order is significant: the first table is the default.
    pub fn new(tables: Vec<CatalogTable>) -> Result<Self> {
        if tables.is_empty() {
            return Err(Error::Catalog("catalog has no tables".to_string()));
        }

        let mut seen = HashSet::new();
        for table in &tables {
            if table.name.trim().is_empty() {
                return Err(Error::Catalog("table with empty name".to_string()));
            }
            if !seen.insert(table.name.as_str()) {
                return Err(Error::Catalog(format!("duplicate table '{}'", table.name)));
            }
            if table.columns.is_empty() {
                return Err(Error::Catalog(format!(
                    "table '{}' has no columns",
                    table.name
                )));
            }
        }

        Ok(Self { tables })
    }

    /// The tables TransHub ships with.
    pub fn builtin() -> Self {
        Self {
            tables: vec![
                CatalogTable::new(
                    "customers",
                    "Заказчики",
                    &["name", "inn", "ogrn", "address", "phone", "email"],
                ),
                CatalogTable::new(
                    "carriers",
                    "Перевозчики",
                    &["name", "inn", "ogrn", "address", "phone", "email"],
                ),
                CatalogTable::new(
                    "cargo",
                    "Грузы",
                    &["name", "weight", "volume", "type", "conditions"],
                ),
                CatalogTable::new(
                    "routes",
                    "Маршруты",
                    &[
                        "loading_address",
                        "loading_date",
                        "unloading_address",
                        "unloading_date",
                    ],
                ),
                CatalogTable::new(
                    "drivers",
                    "Водители",
                    &[
                        "name",
                        "passport_series",
                        "passport_number",
                        "passport_issued_by",
                        "passport_issued_date",
                        "license",
                        "phone",
                    ],
                ),
                CatalogTable::new(
                    "vehicles",
                    "ТС",
                    &["model", "number", "trailer_number", "body_type"],
                ),
                CatalogTable::new(
                    "contracts",
                    "Договоры",
                    &["number", "date", "amount", "payment_terms"],
                ),
            ],
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(content)?;
        Self::new(file.tables)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn tables(&self) -> &[CatalogTable] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&CatalogTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn default_table(&self) -> &CatalogTable {
        // Construction guarantees at least one table
        &self.tables[0]
    }

    /// An empty column is valid for any known table.
    pub fn is_valid_binding(&self, table: &str, column: &str) -> bool {
        match self.table(table) {
            Some(t) => column.is_empty() || t.has_column(column),
            None => false,
        }
    }

    /// Clear a binding the catalog does not recognise.
    ///
    /// Unknown table: table and column become empty. Known table with an
    /// unknown column: only the column is cleared. Returns whether anything
    /// changed.
    pub fn sanitize(&self, binding: &mut Binding) -> bool {
        match self.table(&binding.table_name) {
            None => {
                if binding.table_name.is_empty() && binding.column_name.is_empty() {
                    return false;
                }
                warn!(
                    table = %binding.table_name,
                    column = %binding.column_name,
                    "Clearing binding to unknown table"
                );
                binding.table_name.clear();
                binding.column_name.clear();
                true
            }
            Some(t) if !binding.column_name.is_empty() && !t.has_column(&binding.column_name) => {
                warn!(
                    table = %binding.table_name,
                    column = %binding.column_name,
                    "Clearing unknown column"
                );
                binding.column_name.clear();
                true
            }
            Some(_) => false,
        }
    }
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
