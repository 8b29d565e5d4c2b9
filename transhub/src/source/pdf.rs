use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::SourceKind;
use crate::source::DocumentSource;

/// Used when no MediaBox is found anywhere in the page tree.
const FALLBACK_PAGE_SIZE: (f64, f64) = (595.0, 842.0);

/// Page-based source backed by a PDF.
///
/// Only the page tree is read; rendering belongs to the viewer.
#[derive(Debug, Clone)]
pub struct PdfSource {
    page_sizes: Vec<(f64, f64)>,
}

impl PdfSource {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::ParseFailure(format!("pdf: {}", e)))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(Error::ParseFailure("pdf has no pages".to_string()));
        }

        let page_sizes: Vec<_> = pages
            .values()
            .map(|id| page_dimensions(&doc, *id))
            .collect();

        debug!(pages = page_sizes.len(), "Parsed PDF");
        Ok(Self { page_sizes })
    }
}

impl DocumentSource for PdfSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Pdf
    }

    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn unit_count(&self) -> usize {
        self.page_sizes.len()
    }

    fn header_at(&self, _index: usize) -> Option<String> {
        None
    }

    fn samples_at(&self, _index: usize) -> Vec<String> {
        Vec::new()
    }

    fn page_size(&self, page: u32) -> Option<(f64, f64)> {
        let index = (page as usize).checked_sub(1)?;
        self.page_sizes.get(index).copied()
    }
}

/// MediaBox size of a page, inherited through `Parent` links.
///
/// A `Parent` chain that loops back on itself ends the walk.
fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let mut visited = HashSet::new();
    let mut current = Some(page_id);
    while let Some(id) = current {
        if !visited.insert(id) {
            warn!(object = ?id, "Cyclic Parent chain in page tree");
            break;
        }
        let dict = match doc.get_object(id).and_then(|o| o.as_dict()) {
            Ok(dict) => dict,
            Err(_) => break,
        };
        if let Some(size) = media_box(doc, dict) {
            return size;
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    FALLBACK_PAGE_SIZE
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<(f64, f64)> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = number(&arr[0])?;
    let lly = number(&arr[1])?;
    let urx = number(&arr[2])?;
    let ury = number(&arr[3])?;
    Some(((urx - llx).abs(), (ury - lly).abs()))
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::pdf_bytes;
    use lopdf::dictionary;

    #[test]
    fn test_page_count_and_size() {
        let source = PdfSource::from_bytes(&pdf_bytes(2, 612, 792)).unwrap();
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_size(1), Some((612.0, 792.0)));
        assert_eq!(source.page_size(2), Some((612.0, 792.0)));
        assert_eq!(source.page_size(0), None);
        assert_eq!(source.page_size(3), None);
    }

    #[test]
    fn test_garbage_is_parse_failure() {
        let err = PdfSource::from_bytes(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
        assert_eq!(err.user_message(), Some("file unreadable"));
    }

    #[test]
    fn test_cyclic_parent_chain_falls_back() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.new_object_id();
        let node_id = doc.new_object_id();
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! { "Type" => "Page", "Parent" => node_id }),
        );
        doc.objects.insert(
            node_id,
            Object::Dictionary(dictionary! { "Type" => "Pages", "Parent" => page_id }),
        );
        assert_eq!(page_dimensions(&doc, page_id), FALLBACK_PAGE_SIZE);

        let self_id = doc.new_object_id();
        doc.objects.insert(
            self_id,
            Object::Dictionary(dictionary! { "Type" => "Page", "Parent" => self_id }),
        );
        assert_eq!(page_dimensions(&doc, self_id), FALLBACK_PAGE_SIZE);
    }

    #[test]
    fn test_zero_pages_is_parse_failure() {
        let err = PdfSource::from_bytes(&pdf_bytes(0, 595, 842)).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }
}
