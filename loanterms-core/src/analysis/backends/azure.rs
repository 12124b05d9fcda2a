//! Azure Document Intelligence backend
//!
//! Analysis is a long-running operation: the document is submitted with a
//! POST, the service answers `202 Accepted` with an `Operation-Location`
//! header, and that URL is polled until the status settles.

use crate::analysis::layout::RawAnalyzeResult;
use crate::analysis::DocumentAnalyzer;
use crate::config::AnalysisConfig;
use crate::error::{PipelineError, Result};
use crate::http::{read_string, HttpClient};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// Status document returned while polling an analyze operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: String,
    #[serde(default)]
    pub analyze_result: Option<RawAnalyzeResult>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Where a polled operation stands.
#[derive(Debug)]
pub enum OperationState {
    Running,
    Succeeded(RawAnalyzeResult),
    Failed(String),
}

/// Interpret one poll response.
///
/// A `succeeded` status without an `analyzeResult` is treated as a failure:
/// there is nothing to persist.
pub fn parse_operation(operation: AnalyzeOperation) -> OperationState {
    match operation.status.as_str() {
        "notStarted" | "running" => OperationState::Running,
        "succeeded" => match operation.analyze_result {
            Some(result) => OperationState::Succeeded(result),
            None => OperationState::Failed("operation succeeded without an analyzeResult".to_string()),
        },
        other => {
            let detail = operation
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| "no error detail".to_string());
            OperationState::Failed(format!("operation {other}: {detail}"))
        }
    }
}

pub struct AzureLayoutAnalyzer {
    analyze_url: String,
    api_key: String,
    poll_interval: Duration,
    max_wait: Duration,
    http: HttpClient,
}

impl AzureLayoutAnalyzer {
    pub fn new(config: &AnalysisConfig, http: HttpClient) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| PipelineError::Configuration("analysis endpoint is not set".to_string()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::Configuration("analysis api key is not set".to_string()))?;

        let analyze_url = format!(
            "{}/formrecognizer/documentModels/{}:analyze?api-version={}",
            endpoint, config.model_id, config.api_version
        );

        Ok(Self {
            analyze_url,
            api_key,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
            http,
        })
    }

    fn submit(&self, document: &[u8]) -> Result<String> {
        self.http.execute(
            "submit analysis",
            |agent| {
                agent
                    .post(&self.analyze_url)
                    .set(KEY_HEADER, &self.api_key)
                    .set("Content-Type", "application/octet-stream")
                    .send_bytes(document)
            },
            |response| {
                response
                    .header(OPERATION_LOCATION_HEADER)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        PipelineError::ProviderAnalysis(format!(
                            "response has no {OPERATION_LOCATION_HEADER} header"
                        ))
                    })
            },
        )
    }

    fn poll_once(&self, operation_url: &str) -> Result<AnalyzeOperation> {
        let body = self.http.execute(
            "poll analysis",
            |agent| agent.get(operation_url).set(KEY_HEADER, &self.api_key).call(),
            |response| read_string("poll analysis", response),
        )?;
        serde_json::from_str(&body).map_err(|e| {
            PipelineError::ProviderAnalysis(format!("unreadable operation status: {e}"))
        })
    }

    fn wait_for_result(&self, operation_url: &str) -> Result<RawAnalyzeResult> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            match parse_operation(self.poll_once(operation_url)?) {
                OperationState::Succeeded(result) => {
                    info!(
                        polls,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        pages = result.pages.len(),
                        "layout analysis finished"
                    );
                    return Ok(result);
                }
                OperationState::Failed(message) => return Err(PipelineError::ProviderAnalysis(message)),
                OperationState::Running => {
                    if started.elapsed() >= self.max_wait {
                        return Err(PipelineError::ProviderAnalysis(format!(
                            "analysis did not finish within {}s",
                            self.max_wait.as_secs()
                        )));
                    }
                    debug!(polls, "analysis still running");
                    std::thread::sleep(self.poll_interval);
                }
            }
        }
    }
}

impl DocumentAnalyzer for AzureLayoutAnalyzer {
    fn analyze(&self, document: &[u8]) -> Result<RawAnalyzeResult> {
        let operation_url = self.submit(document)?;
        debug!(operation_url = %operation_url, bytes = document.len(), "analysis submitted");
        self.wait_for_result(&operation_url)
    }

    fn name(&self) -> &str {
        "AzureLayoutAnalyzer"
    }
}
