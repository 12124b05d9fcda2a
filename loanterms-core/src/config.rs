use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

// Environment variable names shared with the function-app deployment
pub const ENV_STORAGE_CONNECTION_STRING: &str = "STORAGE_CONNECTION_STRING";
pub const ENV_DOC_AI_ENDPOINT: &str = "DOC_AI_ENDPOINT";
pub const ENV_DOC_AI_KEY: &str = "DOC_AI_KEY";
pub const ENV_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_OPENAI_KEY: &str = "AZURE_OPENAI_KEY";
pub const ENV_OPENAI_MODEL: &str = "AZURE_OPENAI_MODEL";

const REDACTED: &str = "<redacted>";

// Default value functions for serde
fn default_container() -> String {
    "data".to_string()
}

fn default_read_url_ttl_secs() -> u64 {
    3600 // one hour
}

fn default_model_id() -> String {
    "prebuilt-layout".to_string()
}

fn default_analysis_api_version() -> String {
    "2023-07-31".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_wait_secs() -> u64 {
    300
}

fn default_extractor_api_version() -> String {
    "2024-08-01-preview".to_string()
}

fn default_system_prompt() -> String {
    "Extract the information about house loan terms in a structured format.".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_workers() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Items processed concurrently; 1 keeps the batch strictly sequential
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Blob storage connection string (`AccountName=...;AccountKey=...`)
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Container holding the source documents and their results
    #[serde(default = "default_container")]
    pub container: String,
    /// Lifetime of the signed read URL handed to the fetch step
    #[serde(default = "default_read_url_ttl_secs")]
    pub read_url_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Analysis mode; the layout model is the only one the assembler understands
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_analysis_api_version")]
    pub api_version: String,
    /// Delay between polls of a running analysis operation
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up on an analysis operation after this long
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model deployment name
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default = "default_extractor_api_version")]
    pub api_version: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Whole-request timeout applied to every call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            container: default_container(),
            read_url_ttl_secs: default_read_url_ttl_secs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: default_model_id(),
            api_version: default_analysis_api_version(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: None,
            api_version: default_extractor_api_version(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            analysis: AnalysisConfig::default(),
            extractor: ExtractorConfig::default(),
            http: HttpConfig::default(),
            retry: RetryPolicy::default(),
            workers: default_workers(),
        }
    }
}

impl StorageConfig {
    pub fn read_url_ttl(&self) -> Duration {
        Duration::from_secs(self.read_url_ttl_secs)
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PipelineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::Configuration(format!("invalid config file {path}: {e}")))
    }

    /// Load file (or defaults), then `.env`, then process environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::default(),
        };
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!(path = %env_file.display(), "loaded .env file");
        }
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_STORAGE_CONNECTION_STRING) {
            self.storage.connection_string = Some(v);
        }
        if let Some(v) = get(ENV_DOC_AI_ENDPOINT) {
            self.analysis.endpoint = Some(v);
        }
        if let Some(v) = get(ENV_DOC_AI_KEY) {
            self.analysis.api_key = Some(v);
        }
        if let Some(v) = get(ENV_OPENAI_ENDPOINT) {
            self.extractor.endpoint = Some(v);
        }
        if let Some(v) = get(ENV_OPENAI_KEY) {
            self.extractor.api_key = Some(v);
        }
        if let Some(v) = get(ENV_OPENAI_MODEL) {
            self.extractor.deployment = Some(v);
        }
    }

    /// Settings needed to list, sign and write blobs.
    pub fn validate_storage(&self) -> Result<StorageAccount> {
        let connection_string = require(&self.storage.connection_string, ENV_STORAGE_CONNECTION_STRING)?;
        if self.storage.container.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "storage.container must not be empty".to_string(),
            ));
        }
        StorageAccount::from_connection_string(connection_string)
    }

    /// Settings needed to call the layout-analysis service.
    pub fn validate_analysis(&self) -> Result<()> {
        require_url(&self.analysis.endpoint, ENV_DOC_AI_ENDPOINT)?;
        require(&self.analysis.api_key, ENV_DOC_AI_KEY)?;
        Ok(())
    }

    /// Settings needed to call the schema-extractor service.
    pub fn validate_extractor(&self) -> Result<()> {
        require_url(&self.extractor.endpoint, ENV_OPENAI_ENDPOINT)?;
        require(&self.extractor.api_key, ENV_OPENAI_KEY)?;
        require(&self.extractor.deployment, ENV_OPENAI_MODEL)?;
        Ok(())
    }

    /// Copy of the config safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let hide = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(REDACTED.to_string());
            }
        };
        hide(&mut copy.storage.connection_string);
        hide(&mut copy.analysis.api_key);
        hide(&mut copy.extractor.api_key);
        copy
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PipelineError::Configuration(format!("{name} is not set"))),
    }
}

fn require_url<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    let v = require(value, name)?;
    if v.starts_with("https://") || v.starts_with("http://") {
        Ok(v)
    } else {
        Err(PipelineError::Configuration(format!(
            "{name} must be an http(s) URL, got '{v}'"
        )))
    }
}

/// Blob storage account parsed from a connection string.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    pub account_name: String,
    /// Base64-encoded shared key
    pub account_key: String,
    pub protocol: String,
    pub endpoint_suffix: String,
    /// Explicit endpoint override (emulators, private endpoints)
    pub blob_endpoint: Option<String>,
}

impl StorageAccount {
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let pairs: HashMap<&str, &str> = connection_string
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| part.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let field = |key: &str| {
            pairs
                .get(key)
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .ok_or_else(|| {
                    PipelineError::Configuration(format!("connection string is missing {key}"))
                })
        };

        Ok(Self {
            account_name: field("AccountName")?,
            account_key: field("AccountKey")?,
            protocol: pairs
                .get("DefaultEndpointsProtocol")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "https".to_string()),
            endpoint_suffix: pairs
                .get("EndpointSuffix")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "core.windows.net".to_string()),
            blob_endpoint: pairs
                .get("BlobEndpoint")
                .map(|v| v.trim_end_matches('/').to_string()),
        })
    }

    pub fn blob_base_url(&self) -> String {
        match &self.blob_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "{}://{}.blob.{}",
                self.protocol, self.account_name, self.endpoint_suffix
            ),
        }
    }
}
