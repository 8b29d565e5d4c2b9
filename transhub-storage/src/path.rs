//! Hierarchical object paths for TransHub data.
//!
//! Paths follow the pattern: `kind/owner/name`
//!
//! # Examples
//!
//! ```
//! use transhub_storage::{ObjectKind, ObjectPath};
//!
//! // Mapping metadata of a template
//! let path = ObjectPath::template("contract-2025", "template.json");
//! assert_eq!(path.to_string(), "templates/contract-2025/template.json");
//!
//! // The binary document the template was drawn on
//! let path = ObjectPath::asset("contract-2025", "source.pdf");
//! assert_eq!(path.to_string(), "assets/contract-2025/source.pdf");
//!
//! // Prefix covering every template
//! let prefix = ObjectPath::kind_prefix(ObjectKind::Template);
//! assert_eq!(prefix.to_string(), "templates");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Top-level namespace of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Persisted mapping metadata
    Template,
    /// Binary document asset (PDF, spreadsheet)
    Asset,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Template => write!(f, "templates"),
            ObjectKind::Asset => write!(f, "assets"),
        }
    }
}

impl ObjectKind {
    /// Parse kind from its directory name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "templates" | "template" => Some(ObjectKind::Template),
            "assets" | "asset" => Some(ObjectKind::Asset),
            _ => None,
        }
    }
}

/// Hierarchical path for storage operations.
///
/// Format: `kind/[owner/[name]]`. An empty `name` makes the path a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectPath {
    /// Namespace (templates, assets)
    pub kind: ObjectKind,
    /// Owning template id, empty for a kind-wide prefix
    pub owner: String,
    /// Object name inside the owner directory
    pub name: String,
}

impl ObjectPath {
    /// Create a new object path.
    pub fn new(kind: ObjectKind, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Path of a template's metadata object.
    pub fn template(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Template, owner, name)
    }

    /// Path of a template's binary asset.
    pub fn asset(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Asset, owner, name)
    }

    /// Prefix covering everything stored under one owner.
    pub fn owner_prefix(kind: ObjectKind, owner: impl Into<String>) -> Self {
        Self::new(kind, owner, "")
    }

    /// Prefix covering a whole namespace.
    pub fn kind_prefix(kind: ObjectKind) -> Self {
        Self::new(kind, "", "")
    }

    /// Get the directory prefix (without name).
    pub fn prefix(&self) -> String {
        if self.owner.is_empty() {
            self.kind.to_string()
        } else {
            format!("{}/{}", self.kind, self.owner)
        }
    }

    /// Convert to filesystem path.
    pub fn to_path_buf(&self, base: &std::path::Path) -> PathBuf {
        let mut path = base.join(self.kind.to_string());
        if !self.owner.is_empty() {
            path = path.join(&self.owner);
        }
        if !self.name.is_empty() {
            path = path.join(&self.name);
        }
        path
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('/').filter(|p| !p.is_empty()).collect();
        let kind = ObjectKind::from_str(parts.first()?)?;

        match parts.len() {
            1 => Some(Self::kind_prefix(kind)),
            2 => Some(Self::owner_prefix(kind, parts[1])),
            _ => Some(Self::new(kind, parts[1], parts[2..].join("/"))),
        }
    }

    /// Check if this path is a directory prefix (no name).
    pub fn is_prefix(&self) -> bool {
        self.name.is_empty()
    }

    /// Check whether `other` lies under this path.
    pub fn covers(&self, other: &ObjectPath) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if self.owner.is_empty() {
            return true;
        }
        if self.owner != other.owner {
            return false;
        }
        self.name.is_empty() || self.name == other.name
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.owner.is_empty(), self.name.is_empty()) {
            (true, _) => write!(f, "{}", self.kind),
            (false, true) => write!(f, "{}/{}", self.kind, self.owner),
            (false, false) => write!(f, "{}/{}/{}", self.kind, self.owner, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_display() {
        let path = ObjectPath::asset("ttn-1", "waybill.pdf");
        assert_eq!(path.to_string(), "assets/ttn-1/waybill.pdf");

        let prefix = ObjectPath::owner_prefix(ObjectKind::Template, "ttn-1");
        assert_eq!(prefix.to_string(), "templates/ttn-1");
    }

    #[test]
    fn test_object_path_parse() {
        let path = ObjectPath::parse("templates/ttn-1/template.json").unwrap();
        assert_eq!(path.kind, ObjectKind::Template);
        assert_eq!(path.owner, "ttn-1");
        assert_eq!(path.name, "template.json");
    }

    #[test]
    fn test_object_path_parse_prefixes() {
        let path = ObjectPath::parse("assets").unwrap();
        assert!(path.is_prefix());
        assert!(path.owner.is_empty());

        let path = ObjectPath::parse("assets/ttn-1/").unwrap();
        assert!(path.is_prefix());
        assert_eq!(path.owner, "ttn-1");

        assert!(ObjectPath::parse("unknown/x/y").is_none());
        assert!(ObjectPath::parse("").is_none());
    }

    #[test]
    fn test_object_path_nested_name() {
        let path = ObjectPath::parse("assets/ttn-1/pages/1.png").unwrap();
        assert_eq!(path.name, "pages/1.png");
    }

    #[test]
    fn test_object_path_to_path_buf() {
        let base = std::path::Path::new("/data");
        let path = ObjectPath::template("ttn-1", "template.json");
        assert_eq!(
            path.to_path_buf(base),
            PathBuf::from("/data/templates/ttn-1/template.json")
        );
    }

    #[test]
    fn test_covers() {
        let all = ObjectPath::kind_prefix(ObjectKind::Template);
        let owner = ObjectPath::owner_prefix(ObjectKind::Template, "a");
        let object = ObjectPath::template("a", "template.json");
        let asset = ObjectPath::asset("a", "source.pdf");

        assert!(all.covers(&object));
        assert!(owner.covers(&object));
        assert!(object.covers(&object));
        assert!(!owner.covers(&ObjectPath::template("b", "template.json")));
        assert!(!all.covers(&asset));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(ObjectKind::from_str("templates"), Some(ObjectKind::Template));
        assert_eq!(ObjectKind::from_str("ASSET"), Some(ObjectKind::Asset));
        assert_eq!(ObjectKind::from_str("vector"), None);
    }
}
