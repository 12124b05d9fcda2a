//! Shared blocking HTTP transport for the Azure backends.
//!
//! One `ureq` agent per run, with explicit connect and request timeouts.
//! Every call goes through the `RetryPolicy`; failures are classified here
//! into transient (retried) and final errors.

use crate::config::HttpConfig;
use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;
use std::io::Read;

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(http: &HttpConfig, retry: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(http.connect_timeout())
            .timeout(http.request_timeout())
            .build();
        Self { agent, retry }
    }

    /// Send a request and decode its response, retrying transient failures.
    ///
    /// `send` is invoked once per attempt so each retry builds a fresh request.
    /// Body read failures count as transient; `decode` errors do not.
    pub fn execute<T, S, D>(&self, operation: &str, send: S, decode: D) -> Result<T>
    where
        S: Fn(&ureq::Agent) -> std::result::Result<ureq::Response, ureq::Error>,
        D: Fn(ureq::Response) -> Result<T>,
    {
        self.retry.run(operation, || {
            let response = send(&self.agent).map_err(|e| classify(operation, e))?;
            decode(response)
        })
    }
}

pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

pub fn classify(operation: &str, err: ureq::Error) -> PipelineError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            let message = format!("HTTP {status}: {snippet}");
            if is_transient_status(status) {
                PipelineError::transient(operation, message)
            } else {
                PipelineError::item_processing(operation, 1, message)
            }
        }
        ureq::Error::Transport(transport) => PipelineError::transient(operation, transport.to_string()),
    }
}

pub fn read_bytes(operation: &str, response: ureq::Response) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut buffer)
        .map_err(|e| PipelineError::transient(operation, format!("reading body: {e}")))?;
    Ok(buffer)
}

pub fn read_string(operation: &str, response: ureq::Response) -> Result<String> {
    let bytes = read_bytes(operation, response)?;
    String::from_utf8(bytes)
        .map_err(|e| PipelineError::item_processing(operation, 1, format!("body is not UTF-8: {e}")))
}
