use anyhow::Result;
use std::fmt;
use std::path::Path;

use crate::generate_doc_id;

/// Media types the language model accepts for scanned deeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
    Webp,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Suffix used for staged copies so the upload keeps a recognisable name
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Png => ".png",
            Self::Jpeg => ".jpg",
            Self::Webp => ".webp",
        }
    }
}

/// A user-supplied document: display name plus raw content.
#[derive(Clone)]
pub struct Document {
    pub doc_id: String,
    pub display_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(display_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let display_name = display_name.into();
        let Some(kind) = DocumentKind::from_name(&display_name) else {
            anyhow::bail!("Unsupported document format: {}", display_name);
        };
        if bytes.is_empty() {
            anyhow::bail!("Document is empty: {}", display_name);
        }

        Ok(Self {
            doc_id: generate_doc_id(&bytes),
            display_name,
            kind,
            bytes,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("doc_id", &self.doc_id)
            .field("display_name", &self.display_name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}
