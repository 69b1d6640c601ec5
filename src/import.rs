//! Import boundary
//!
//! File bytes arrive asynchronously (a tokio task reads them); decoding runs
//! synchronously on the UI thread once the text is available. Every failure
//! is turned into an [`ImportError`] whose `Display` is the message shown to
//! the user. Nothing here panics on bad input.
//!
//! ```text
//!  request(kind, path) ──spawn──► read_import ──► slot: Arc<Mutex<Option<RawImport>>>
//!                                                       │
//!  poll() each frame ◄── try_lock().take() ─────────────┘
//!        │
//!        └──► decode_import ──► Imported { Map | Security }
//! ```

use floorplan_model::{FormatError, GraphDecoder, MapDocument, SecurityDocument};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Map,
    Security,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Map => "map",
            DocumentKind::Security => "security",
        })
    }
}

/// File contents as delivered by the reader, not yet decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImport {
    pub kind: DocumentKind,
    pub file_name: String,
    /// The text, or the reader's error message.
    pub contents: Result<String, String>,
}

impl RawImport {
    pub fn text(kind: DocumentKind, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            contents: Ok(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Error parsing {kind} file: {source}")]
    Parse {
        kind: DocumentKind,
        #[source]
        source: FormatError,
    },

    #[error("Error reading {kind} file")]
    Read { kind: DocumentKind, detail: String },
}

impl ImportError {
    pub fn kind(&self) -> DocumentKind {
        match self {
            ImportError::Parse { kind, .. } | ImportError::Read { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportedDocument {
    Map(MapDocument),
    Security(SecurityDocument),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    pub file_name: String,
    pub document: ImportedDocument,
}

/// Decode raw file text into a document of the requested kind.
pub fn decode_import(decoder: &GraphDecoder, raw: RawImport) -> Result<Imported, ImportError> {
    let kind = raw.kind;
    let text = raw
        .contents
        .map_err(|detail| ImportError::Read { kind, detail })?;

    let document = match kind {
        DocumentKind::Map => decoder.decode_str(&text).map(ImportedDocument::Map),
        DocumentKind::Security => SecurityDocument::parse(&text).map(ImportedDocument::Security),
    }
    .map_err(|source| ImportError::Parse { kind, source })?;

    info!(%kind, file = %raw.file_name, "document decoded");
    Ok(Imported {
        file_name: raw.file_name,
        document,
    })
}

/// Read a file as text. IO failures are captured in the result, not returned.
pub async fn read_import(kind: DocumentKind, path: impl AsRef<Path>) -> RawImport {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
        warn!(%kind, path = %path.display(), error = %err, "failed to read import");
        err.to_string()
    });

    RawImport {
        kind,
        file_name,
        contents,
    }
}

// =============================================================================
// QUEUE
// =============================================================================

type ImportSlot = Arc<Mutex<Option<RawImport>>>;

/// Background file reads, collected by polling from the UI loop.
#[derive(Debug)]
pub struct ImportQueue {
    runtime: tokio::runtime::Handle,
    pending: Vec<ImportSlot>,
}

impl ImportQueue {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            runtime,
            pending: Vec::new(),
        }
    }

    /// Start reading `path` in the background.
    pub fn request(&mut self, kind: DocumentKind, path: PathBuf) {
        let slot: ImportSlot = Arc::new(Mutex::new(None));
        let result = Arc::clone(&slot);
        debug!(%kind, path = %path.display(), "import requested");
        self.runtime.spawn(async move {
            let raw = read_import(kind, &path).await;
            *result.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        });
        self.pending.push(slot);
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Reads that finished since the last poll, in request order.
    pub fn poll(&mut self) -> Vec<RawImport> {
        let mut finished = Vec::new();
        self.pending.retain(|slot| match slot.try_lock() {
            Ok(mut guard) => match guard.take() {
                Some(raw) => {
                    finished.push(raw);
                    false
                }
                None => true,
            },
            // whoever held the lock is gone; nothing more will arrive
            Err(TryLockError::Poisoned(poisoned)) => {
                let raw = poisoned.into_inner().take();
                warn!(recovered = raw.is_some(), "import slot poisoned");
                finished.extend(raw);
                false
            }
            Err(TryLockError::WouldBlock) => true,
        });
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MAP: &str = r#"{
        "nodeKeys": ["key", "x", "y", "type", "content"],
        "lineKeys": ["startNode", "endNode"],
        "nodeArr": [["A", 0, 0, 0, "A"], ["B", 1000, 0, 6, "B"]],
        "lineArr": [["A", "B"]],
        "width": 5000,
        "height": 5000
    }"#;

    fn poisoned_slot(contents: Option<RawImport>) -> ImportSlot {
        let slot: ImportSlot = Arc::new(Mutex::new(None));
        let writer = Arc::clone(&slot);
        let _ = std::thread::spawn(move || {
            let mut guard = writer.lock().unwrap();
            *guard = contents;
            panic!("reader died holding the slot");
        })
        .join();
        assert!(slot.is_poisoned());
        slot
    }

    #[test]
    fn poisoned_slots_still_finish() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut queue = ImportQueue::new(runtime.handle().clone());
        queue.pending.push(poisoned_slot(Some(RawImport::text(
            DocumentKind::Map,
            "site.json",
            MAP,
        ))));
        queue.pending.push(poisoned_slot(None));
        assert_eq!(queue.pending(), 2);

        let finished = queue.poll();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].file_name, "site.json");
        assert!(!queue.is_loading());
    }

    #[test]
    fn map_text_decodes() {
        let raw = RawImport::text(DocumentKind::Map, "site.json", MAP);
        let imported = decode_import(&GraphDecoder::default(), raw).unwrap();
        assert_eq!(imported.file_name, "site.json");
        let ImportedDocument::Map(doc) = imported.document else {
            panic!("expected a map document");
        };
        assert_eq!(doc.nodes().len(), 2);
        assert_eq!(doc.edges().len(), 1);
    }

    #[test]
    fn security_text_decodes() {
        let raw = RawImport::text(
            DocumentKind::Security,
            "avoid.json",
            r#"{"AvoidSceneSet":[{"id":3,"name":"Wide","config":{"noload":{"forward":900}}}]}"#,
        );
        let imported = decode_import(&GraphDecoder::default(), raw).unwrap();
        assert!(matches!(imported.document, ImportedDocument::Security(_)));
    }

    #[test]
    fn parse_failure_names_the_kind() {
        let raw = RawImport::text(DocumentKind::Map, "bad.json", r#"{"width": 10}"#);
        let err = decode_import(&GraphDecoder::default(), raw).unwrap_err();
        assert_eq!(err.kind(), DocumentKind::Map);
        assert!(
            err.to_string().starts_with("Error parsing map file: "),
            "{err}"
        );

        let raw = RawImport::text(DocumentKind::Security, "bad.json", r#"{"profiles": []}"#);
        let err = decode_import(&GraphDecoder::default(), raw).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error parsing security file: "));
    }

    #[test]
    fn read_failure_has_fixed_message() {
        let raw = RawImport {
            kind: DocumentKind::Security,
            file_name: "gone.json".into(),
            contents: Err("No such file or directory".into()),
        };
        let err = decode_import(&GraphDecoder::default(), raw).unwrap_err();
        assert_eq!(err.to_string(), "Error reading security file");
    }

    #[test]
    fn wrong_kind_is_a_parse_error() {
        let raw = RawImport::text(DocumentKind::Security, "site.json", MAP);
        let err = decode_import(&GraphDecoder::default(), raw).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Parse {
                kind: DocumentKind::Security,
                source: FormatError::MissingField("AvoidSceneSet"),
            }
        ));
    }
}
