use extract::{LlmConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub readiness: RetryConfig,
    pub server: ServerConfig,
}

/// Polling schedule used while uploaded documents are being processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_mb: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            readiness: RetryConfig {
                max_retries: 10,
                initial_backoff_ms: 500,
                max_backoff_ms: 5000,
                timeout_secs: 60,
            },
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
                max_upload_mb: 50,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` resolves.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("GEMINI_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            config.llm.model = model;
        }
        if let Some(secs) = lookup("GEMINI_TIMEOUT_SECS") {
            config.llm.request_timeout_secs = parse_var("GEMINI_TIMEOUT_SECS", &secs)?;
        }
        if let Some(retries) = lookup("READINESS_MAX_RETRIES") {
            config.readiness.max_retries = parse_var("READINESS_MAX_RETRIES", &retries)?;
        }
        if let Some(secs) = lookup("READINESS_TIMEOUT_SECS") {
            config.readiness.timeout_secs = parse_var("READINESS_TIMEOUT_SECS", &secs)?;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(mb) = lookup("MAX_UPLOAD_MB") {
            config.server.max_upload_mb = parse_var("MAX_UPLOAD_MB", &mb)?;
        }

        Ok(config)
    }

    pub fn readiness_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.readiness.max_retries,
            self.readiness.initial_backoff_ms,
            self.readiness.max_backoff_ms,
            self.readiness.timeout_secs,
        )
    }
}

fn parse_var<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    use anyhow::Context;

    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", name, value))
}
