use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("API credential not configured: set {0}")]
    MissingCredential(&'static str),

    #[error("request to language model failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("language model service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("{0} is still being processed")]
    StillProcessing(String),

    #[error("processing of {0} failed on the model service")]
    ProcessingFailed(String),

    #[error("{resource} was not ready after {waited:?}")]
    NotReady { resource: String, waited: Duration },

    #[error("language model returned no text")]
    EmptyResponse,

    #[error("model response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not stage {name} for upload: {source}")]
    Staging {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Whether a readiness poll should try again after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StillProcessing(_) => true,
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
