use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::credential::ApiKey;
use crate::error::{ExtractError, Result};

/// Processing state of an uploaded file on the model service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    /// Also covers states this client does not know about
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Handle to a document uploaded to the model service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

/// The language model collaborator.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Upload a staged document and return its remote handle.
    async fn upload(&self, path: &Path, display_name: &str, mime_type: &str) -> Result<RemoteFile>;

    /// Current processing state of an uploaded file.
    async fn file_state(&self, file: &RemoteFile) -> Result<FileState>;

    /// Ask the model to answer `user_prompt` over the given files.
    async fn generate(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        files: &[RemoteFile],
    ) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct UploadMetadata<'a> {
    file: UploadFile<'a>,
}

#[derive(Serialize)]
struct UploadFile<'a> {
    display_name: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    File { file_data: FileData<'a> },
}

#[derive(Serialize)]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str, // "application/json" for structured output
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: ApiKey) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ExtractError::Service {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn upload(&self, path: &Path, display_name: &str, mime_type: &str) -> Result<RemoteFile> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractError::Staging {
                name: display_name.to_string(),
                source,
            })?;

        // Resumable upload: open a session, then send the bytes and finalize
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let start = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadMetadata {
                file: UploadFile { display_name },
            })
            .send()
            .await?;
        let start = Self::check(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ExtractError::Service {
                status: start.status().as_u16(),
                body: "upload session did not return an upload URL".to_string(),
            })?;

        let size = bytes.len();
        let finish = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::check(finish).await?.json().await?;

        info!(
            display_name,
            file = %uploaded.file.name,
            bytes = size,
            state = ?uploaded.file.state,
            "Uploaded document"
        );

        Ok(uploaded.file)
    }

    async fn file_state(&self, file: &RemoteFile) -> Result<FileState> {
        let url = format!("{}/v1beta/{}", self.base_url, file.name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .send()
            .await?;
        let remote: RemoteFile = Self::check(response).await?.json().await?;

        debug!(file = %remote.name, state = ?remote.state, "Polled file state");
        Ok(remote.state)
    }

    async fn generate(
        &self,
        system_instruction: &str,
        user_prompt: &str,
        files: &[RemoteFile],
    ) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut parts = vec![Part::Text { text: user_prompt }];
        parts.extend(files.iter().map(|f| Part::File {
            file_data: FileData {
                mime_type: &f.mime_type,
                file_uri: &f.uri,
            },
        }));

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text {
                    text: system_instruction,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await?;
        let generated: GenerateResponse = Self::check(response).await?.json().await?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ExtractError::EmptyResponse);
        }

        info!(model = %self.model, files = files.len(), chars = text.len(), "Model responded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_deserializes() {
        let json = r#"{"name":"files/abc-123","displayName":"deed.pdf","mimeType":"application/pdf","sizeBytes":"1024","uri":"https://generativelanguage.googleapis.com/v1beta/files/abc-123","state":"PROCESSING"}"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();

        assert_eq!(file.name, "files/abc-123");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.state, FileState::Processing);

        let unknown: RemoteFile = serde_json::from_str(
            r#"{"name":"files/x","mimeType":"image/png","uri":"u","state":"SOMETHING_NEW"}"#,
        )
        .unwrap();
        assert_eq!(unknown.state, FileState::StateUnspecified);
    }

    #[test]
    fn test_generate_request_shape() {
        let files = [RemoteFile {
            name: "files/abc".into(),
            uri: "https://example.test/files/abc".into(),
            mime_type: "application/pdf".into(),
            state: FileState::Active,
        }];
        let mut parts = vec![Part::Text { text: "Extrae" }];
        parts.push(Part::File {
            file_data: FileData {
                mime_type: &files[0].mime_type,
                file_uri: &files[0].uri,
            },
        });
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part::Text { text: "ROL" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["system_instruction"]["parts"][0]["text"], "ROL");
        assert!(value["system_instruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["contents"][0]["parts"][1]["file_data"]["file_uri"],
            "https://example.test/files/abc"
        );
        assert_eq!(value["generation_config"]["response_mime_type"], "application/json");
    }

    #[test]
    fn test_generate_response_text_is_joined() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"{\"accionistas\":"},{"text":"[]}"}],"role":"model"}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        assert_eq!(text, r#"{"accionistas":[]}"#);
    }

    mod http {
        use super::*;
        use axum::{
            Json, Router,
            body::Bytes,
            extract::Path as UrlPath,
            http::{HeaderMap, StatusCode, header::HOST},
            response::IntoResponse,
            routing::{get, post},
        };
        use ingest::Document;
        use serde_json::{Value, json};
        use std::sync::{Arc, Mutex};

        const KEY: &str = "test-key";

        async fn serve(app: Router) -> GeminiClient {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let config = LlmConfig {
                base_url: format!("http://{}", addr),
                ..LlmConfig::default()
            };
            GeminiClient::new(&config, ApiKey::new(KEY).unwrap()).unwrap()
        }

        fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
            headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
        }

        fn remote(name: &str) -> RemoteFile {
            RemoteFile {
                name: name.into(),
                uri: format!("https://files.test/{}", name),
                mime_type: "application/pdf".into(),
                state: FileState::Processing,
            }
        }

        async fn start_session(headers: HeaderMap) -> impl IntoResponse {
            assert_eq!(header(&headers, "x-goog-api-key"), KEY);
            assert_eq!(header(&headers, "x-goog-upload-protocol"), "resumable");
            assert_eq!(header(&headers, "x-goog-upload-command"), "start");
            assert_eq!(header(&headers, "x-goog-upload-header-content-length"), "8");
            assert_eq!(header(&headers, "x-goog-upload-header-content-type"), "application/pdf");

            let url = format!("http://{}/session/1", header(&headers, HOST.as_str()));
            ([("x-goog-upload-url", url)], Json(json!({})))
        }

        async fn finalize(headers: HeaderMap, body: Bytes) -> Json<Value> {
            assert_eq!(header(&headers, "x-goog-upload-command"), "upload, finalize");
            assert_eq!(header(&headers, "x-goog-upload-offset"), "0");
            assert_eq!(&body[..], b"%PDF-1.7");

            Json(json!({"file": {
                "name": "files/abc",
                "displayName": "escritura.pdf",
                "mimeType": "application/pdf",
                "uri": "https://files.test/files/abc",
                "state": "PROCESSING"
            }}))
        }

        #[tokio::test]
        async fn test_resumable_upload() {
            let client = serve(
                Router::new()
                    .route("/upload/v1beta/files", post(start_session))
                    .route("/session/1", post(finalize)),
            )
            .await;
            let document = Document::new("escritura.pdf", b"%PDF-1.7".to_vec()).unwrap();
            let staged = ingest::stage(&document).unwrap();

            let file = client
                .upload(staged.path(), "escritura.pdf", "application/pdf")
                .await
                .unwrap();

            assert_eq!(file.name, "files/abc");
            assert_eq!(file.uri, "https://files.test/files/abc");
            assert_eq!(file.state, FileState::Processing);
        }

        #[tokio::test]
        async fn test_upload_without_session_url() {
            let client = serve(Router::new().route(
                "/upload/v1beta/files",
                post(|| async { Json(json!({})) }),
            ))
            .await;
            let document = Document::new("escritura.pdf", b"%PDF-1.7".to_vec()).unwrap();
            let staged = ingest::stage(&document).unwrap();

            let err = client
                .upload(staged.path(), "escritura.pdf", "application/pdf")
                .await
                .unwrap_err();

            match err {
                ExtractError::Service { status, body } => {
                    assert_eq!(status, 200);
                    assert!(body.contains("upload URL"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_non_success_status_is_service_error() {
            let client = serve(Router::new().route(
                "/upload/v1beta/files",
                post(|| async { (StatusCode::FORBIDDEN, "API key not valid") }),
            ))
            .await;
            let document = Document::new("escritura.pdf", b"%PDF-1.7".to_vec()).unwrap();
            let staged = ingest::stage(&document).unwrap();

            let err = client
                .upload(staged.path(), "escritura.pdf", "application/pdf")
                .await
                .unwrap_err();

            match err {
                ExtractError::Service { status, body } => {
                    assert_eq!(status, 403);
                    assert_eq!(body, "API key not valid");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_file_state_poll() {
            let client = serve(Router::new().route(
                "/v1beta/files/:id",
                get(|UrlPath(id): UrlPath<String>, headers: HeaderMap| async move {
                    assert_eq!(header(&headers, "x-goog-api-key"), KEY);
                    Json(json!({
                        "name": format!("files/{}", id),
                        "mimeType": "application/pdf",
                        "uri": "https://files.test/files/abc",
                        "state": "ACTIVE"
                    }))
                }),
            ))
            .await;

            let state = client.file_state(&remote("files/abc")).await.unwrap();
            assert_eq!(state, FileState::Active);

            let missing = serve(Router::new()).await;
            let err = missing.file_state(&remote("files/abc")).await.unwrap_err();
            assert!(matches!(err, ExtractError::Service { status: 404, .. }));
        }

        #[tokio::test]
        async fn test_generate_sends_files_in_json_mode() {
            let seen: Arc<Mutex<Option<(String, Value)>>> = Arc::new(Mutex::new(None));
            let recorder = seen.clone();
            let client = serve(Router::new().route(
                "/v1beta/models/:model",
                post(move |UrlPath(model): UrlPath<String>, Json(body): Json<Value>| {
                    let recorder = recorder.clone();
                    async move {
                        *recorder.lock().unwrap() = Some((model, body));
                        Json(json!({"candidates": [{"content": {"role": "model", "parts": [
                            {"text": "```json\n{\"accionistas\": []"},
                            {"text": "}\n```"}
                        ]}}]}))
                    }
                }),
            ))
            .await;

            let text = client
                .generate("ROL", "Extrae los datos actuales.", &[remote("files/abc")])
                .await
                .unwrap();
            assert_eq!(text, "```json\n{\"accionistas\": []}\n```");

            let (model, body) = seen.lock().unwrap().take().unwrap();
            assert_eq!(model, "gemini-2.5-flash:generateContent");
            assert_eq!(body["system_instruction"]["parts"][0]["text"], "ROL");
            assert_eq!(body["contents"][0]["parts"][0]["text"], "Extrae los datos actuales.");
            assert_eq!(
                body["contents"][0]["parts"][1]["file_data"]["file_uri"],
                "https://files.test/files/abc"
            );
            assert_eq!(body["generation_config"]["response_mime_type"], "application/json");
        }

        #[tokio::test]
        async fn test_generate_without_candidates_is_empty_response() {
            let client = serve(Router::new().route(
                "/v1beta/models/:model",
                post(|| async { Json(json!({"candidates": []})) }),
            ))
            .await;

            let err = client.generate("ROL", "Extrae", &[]).await.unwrap_err();
            assert!(matches!(err, ExtractError::EmptyResponse));
        }
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = LlmConfig {
            base_url: "http://localhost:9999/".into(),
            ..LlmConfig::default()
        };
        let client = GeminiClient::new(&config, ApiKey::new("k").unwrap()).unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
