use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::Document;

/// A document copied to a temporary file for upload.
///
/// The file is deleted when this value is dropped, so callers should keep it
/// alive only for the duration of the upload.
pub struct StagedDocument {
    file: NamedTempFile,
}

impl StagedDocument {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Write a document's bytes to a fresh temporary file.
pub fn stage(document: &Document) -> io::Result<StagedDocument> {
    let mut file = tempfile::Builder::new()
        .prefix("deed-")
        .suffix(document.kind.suffix())
        .tempfile()?;

    file.write_all(&document.bytes)?;
    file.flush()?;

    debug!(
        doc_id = %document.doc_id,
        path = %file.path().display(),
        bytes = document.len(),
        "Staged document"
    );

    Ok(StagedDocument { file })
}
