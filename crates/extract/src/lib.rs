pub mod credential;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod retry;
pub mod sanitize;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use credential::ApiKey;
pub use error::ExtractError;
pub use llm::{FileState, GeminiClient, LlmConfig, ModelClient, RemoteFile};
pub use retry::RetryPolicy;
pub use sanitize::{extract_json_object, parse_response};
pub use schema::{ExtractionResult, Nature, ShareholderRecord, SmeFlag, TotalsSummary};

use error::Result;
use ingest::Document;
use tracing::{info, warn};

/// Tolerance when checking that percentages add up to 100
const SUM_TOLERANCE: f64 = 0.5;

pub struct Extractor<C> {
    client: C,
    readiness: RetryPolicy,
}

impl<C: ModelClient> Extractor<C> {
    pub fn new(client: C, readiness: RetryPolicy) -> Self {
        Self { client, readiness }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Extract the shareholder structure described by a set of deeds
    pub async fn extract(&self, documents: &[Document]) -> Result<ExtractionResult> {
        let mut files = Vec::with_capacity(documents.len());
        for document in documents {
            files.push(self.upload(document).await?);
        }

        for file in &files {
            self.wait_until_active(file).await?;
        }

        let raw = self
            .client
            .generate(&prompt::build_system_prompt(), prompt::USER_PROMPT, &files)
            .await?;

        let result = parse_response(&raw)?;
        check_sums(&result);

        info!(
            documents = documents.len(),
            shareholders = result.shareholders.len(),
            "Extracted shareholder structure"
        );

        Ok(result)
    }

    async fn upload(&self, document: &Document) -> Result<RemoteFile> {
        // The staged copy is removed when `staged` drops, whatever the upload outcome
        let staged = ingest::stage(document).map_err(|source| ExtractError::Staging {
            name: document.display_name.clone(),
            source,
        })?;

        self.client
            .upload(staged.path(), &document.display_name, document.mime_type())
            .await
    }

    async fn wait_until_active(&self, file: &RemoteFile) -> Result<()> {
        if file.state == FileState::Active {
            return Ok(());
        }

        let client = &self.client;
        self.readiness
            .retry(&file.name, move || async move {
                match client.file_state(file).await? {
                    FileState::Active => Ok(()),
                    FileState::Failed => Err(ExtractError::ProcessingFailed(file.name.clone())),
                    _ => Err(ExtractError::StillProcessing(file.name.clone())),
                }
            })
            .await
    }
}

/// Percentages are the model's responsibility; inconsistencies are logged, not rejected
fn check_sums(result: &ExtractionResult) {
    if let Some(sum) = result.totals.sum() {
        if (sum - 100.0).abs() > SUM_TOLERANCE {
            warn!(sum, "Public and private totals do not add up to 100");
        }
    }

    if !result.shareholders.is_empty() {
        let sum = result.shareholder_percentage_sum();
        if (sum - 100.0).abs() > SUM_TOLERANCE {
            warn!(sum, "Shareholder percentages do not add up to 100");
        }
    }
}
