use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::{Document, DocumentKind};

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<Document> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");

        if DocumentKind::from_name(name).is_none() {
            anyhow::bail!("Unsupported document format: {:?}", path);
        }

        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        Document::new(name, bytes)
    }

    pub async fn read_directory(dir: &Path) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let supported = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(DocumentKind::from_name)
                .is_some();

            if supported {
                documents.push(Self::read_file(&path).await?);
            } else {
                warn!(path = %path.display(), "Skipping unsupported file");
            }
        }

        // Directory iteration order is platform dependent
        documents.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(documents)
    }
}
