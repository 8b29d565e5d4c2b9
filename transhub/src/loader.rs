//! Cancelable document parsing.
//!
//! Parsing is the one slow step in an editing session. Every `load` takes a
//! fresh generation number and aborts whatever was in flight; a result whose
//! generation is no longer current is discarded as `Superseded`.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::source::{parse_asset, Asset, AutoWorkbookReader, DocumentSource, WorkbookReader};

pub enum LoadOutcome {
    Loaded(Box<dyn DocumentSource>),
    /// A newer request started before this one finished.
    Superseded,
}

impl LoadOutcome {
    pub fn into_source(self) -> Option<Box<dyn DocumentSource>> {
        match self {
            LoadOutcome::Loaded(source) => Some(source),
            LoadOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, LoadOutcome::Superseded)
    }
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded(source) => f.debug_tuple("Loaded").field(source).finish(),
            LoadOutcome::Superseded => write!(f, "Superseded"),
        }
    }
}

pub struct SourceLoader {
    reader: Arc<dyn WorkbookReader>,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl SourceLoader {
    pub fn new(reader: Arc<dyn WorkbookReader>) -> Self {
        Self {
            reader,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Parse `asset` off the async runtime. Last request wins.
    pub async fn load(&self, asset: Asset, sheet: Option<String>) -> Result<LoadOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let reader = Arc::clone(&self.reader);
        let file_name = asset.file_name.clone();

        let handle = tokio::task::spawn_blocking(move || {
            parse_asset(&asset, sheet.as_deref(), reader.as_ref())
        });

        if let Some(previous) = self.in_flight.lock().replace(handle.abort_handle()) {
            previous.abort();
        }

        let result = handle.await;

        if self.generation() != generation {
            debug!(file = %file_name, generation, "Discarding superseded parse");
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(parsed) => parsed.map(LoadOutcome::Loaded),
            Err(e) if e.is_cancelled() => Ok(LoadOutcome::Superseded),
            Err(e) => Err(Error::ParseFailure(format!("parser task failed: {}", e))),
        }
    }

    /// Invalidate whatever is in flight.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.in_flight.lock().take() {
            handle.abort();
        }
    }
}

impl Default for SourceLoader {
    fn default() -> Self {
        Self::new(Arc::new(AutoWorkbookReader::default()))
    }
}

impl fmt::Debug for SourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLoader")
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;
    use crate::source::test_support::xlsx_bytes;
    use crate::source::{CsvWorkbookReader, Workbook};
    use std::time::Duration;

    /// Sleeps before delegating when the file name starts with "slow".
    struct SlowReader;

    impl WorkbookReader for SlowReader {
        fn read(&self, file_name: &str, bytes: &[u8]) -> Result<Workbook> {
            if file_name.starts_with("slow") {
                std::thread::sleep(Duration::from_millis(300));
            }
            CsvWorkbookReader::default().read(file_name, bytes)
        }
    }

    fn csv(name: &str, content: &'static str) -> Asset {
        Asset::new(SourceKind::Excel, name, content.as_bytes())
    }

    #[tokio::test]
    async fn test_load_csv() {
        let loader = SourceLoader::default();
        let outcome = loader
            .load(csv("a.csv", "x,y\n1,2\n"), None)
            .await
            .unwrap();
        let source = outcome.into_source().unwrap();
        assert_eq!(source.headers(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_load_xlsx_sheet() {
        let bytes = xlsx_bytes(&[
            ("Заказы", vec![vec!["Номер"], vec!["17"]]),
            ("Водители", vec![vec!["ФИО", "ИНН"], vec!["Иванов", "7701"]]),
        ]);
        let asset = Asset::new(SourceKind::Excel, "registry.xlsx", bytes);

        let loader = SourceLoader::default();
        let source = loader
            .load(asset, Some("Водители".to_string()))
            .await
            .unwrap()
            .into_source()
            .unwrap();
        assert_eq!(source.sheet_name(), Some("Водители"));
        assert_eq!(source.sheet_names(), vec!["Заказы", "Водители"]);
        assert_eq!(source.headers(), vec!["ФИО", "ИНН"]);
        assert_eq!(source.samples_at(1), vec!["7701"]);
    }

    #[tokio::test]
    async fn test_last_request_wins() {
        let loader = SourceLoader::new(Arc::new(SlowReader));

        let (first, second) = tokio::join!(
            loader.load(csv("slow.csv", "old\n1\n"), None),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                loader.load(csv("fast.csv", "new\n2\n"), None).await
            }
        );

        assert!(first.unwrap().is_superseded());
        let source = second.unwrap().into_source().unwrap();
        assert_eq!(source.headers(), vec!["new"]);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight() {
        let loader = SourceLoader::new(Arc::new(SlowReader));

        let (outcome, _) = tokio::join!(loader.load(csv("slow.csv", "a\n"), None), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            loader.cancel();
        });

        assert!(outcome.unwrap().is_superseded());
    }

    #[tokio::test]
    async fn test_parse_failure_propagates() {
        let loader = SourceLoader::default();
        let asset = Asset::new(SourceKind::Pdf, "broken.pdf", &b"%PDF-garbage"[..]);
        let err = loader.load(asset, None).await.unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }
}
