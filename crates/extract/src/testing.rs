//! In-memory [`ModelClient`] returning canned text, for tests without a live service.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ExtractError, Result};
use crate::llm::{FileState, ModelClient, RemoteFile};

pub struct CannedClient {
    reply: String,
    polls_until_active: usize,
    fail_upload: bool,
    fail_processing: bool,
    uploads: Mutex<Vec<UploadRecord>>,
    polls: Mutex<usize>,
}

/// What the client saw during one upload.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub path: PathBuf,
    pub display_name: String,
    pub mime_type: String,
    pub existed: bool,
    pub bytes: Vec<u8>,
}

impl CannedClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            polls_until_active: 0,
            fail_upload: false,
            fail_processing: false,
            uploads: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
        }
    }

    /// Report `Processing` for this many polls before turning `Active`.
    pub fn processing_for(mut self, polls: usize) -> Self {
        self.polls_until_active = polls;
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    /// Files end up in the `Failed` state after upload.
    pub fn failing_processing(mut self) -> Self {
        self.fail_processing = true;
        self
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn polls(&self) -> usize {
        self.polls.lock().map(|p| *p).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for CannedClient {
    async fn upload(&self, path: &Path, display_name: &str, mime_type: &str) -> Result<RemoteFile> {
        let existed = path.exists();
        let bytes = std::fs::read(path).unwrap_or_default();

        let index = {
            let mut uploads = self.uploads.lock().expect("uploads lock");
            uploads.push(UploadRecord {
                path: path.to_path_buf(),
                display_name: display_name.to_string(),
                mime_type: mime_type.to_string(),
                existed,
                bytes,
            });
            uploads.len()
        };

        if self.fail_upload {
            return Err(ExtractError::Service {
                status: 503,
                body: "upload unavailable".to_string(),
            });
        }

        let state = if self.polls_until_active == 0 && !self.fail_processing {
            FileState::Active
        } else {
            FileState::Processing
        };

        Ok(RemoteFile {
            name: format!("files/canned-{}", index),
            uri: format!("https://files.test/canned-{}", index),
            mime_type: mime_type.to_string(),
            state,
        })
    }

    async fn file_state(&self, _file: &RemoteFile) -> Result<FileState> {
        let mut polls = self.polls.lock().expect("polls lock");
        *polls += 1;

        if self.fail_processing {
            Ok(FileState::Failed)
        } else if *polls >= self.polls_until_active {
            Ok(FileState::Active)
        } else {
            Ok(FileState::Processing)
        }
    }

    async fn generate(
        &self,
        _system_instruction: &str,
        _user_prompt: &str,
        _files: &[RemoteFile],
    ) -> Result<String> {
        Ok(self.reply.clone())
    }
}
