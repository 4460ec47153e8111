use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid sheet name: {0:?}")]
    SheetName(String),

    #[error("XML write error: {0}")]
    Xml(#[from] std::fmt::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
