pub mod document;
pub mod reader;
pub mod staging;

pub use document::{Document, DocumentKind};
pub use reader::FileReader;
pub use staging::{stage, StagedDocument};

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Generate a stable document ID from its content
pub fn generate_doc_id(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Load a single document, or every supported document in a directory
pub async fn ingest_path(path: &Path) -> Result<Vec<Document>> {
    if path.is_file() {
        Ok(vec![FileReader::read_file(path).await?])
    } else if path.is_dir() {
        FileReader::read_directory(path).await
    } else {
        anyhow::bail!("Path not found: {:?}", path)
    }
}
