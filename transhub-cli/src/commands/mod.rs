pub mod catalog;
pub mod inspect;
pub mod templates;

pub use catalog::run_catalog;
pub use inspect::run_inspect;

/// Horizontal rule used by all table-style reports
pub(crate) const RULE: &str =
    "--------------------------------------------------------------------------------";
