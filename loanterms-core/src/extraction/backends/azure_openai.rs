//! Azure OpenAI chat-completions backend with structured outputs.

use crate::config::ExtractorConfig;
use crate::error::{PipelineError, Result};
use crate::extraction::{OutputSchema, SchemaExtractor};
use crate::http::{read_string, HttpClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Chat-completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: Value,
}

/// Chat-completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

pub struct AzureOpenAiExtractor {
    completions_url: String,
    api_key: String,
    system_prompt: String,
    http: HttpClient,
}

impl AzureOpenAiExtractor {
    pub fn new(config: &ExtractorConfig, http: HttpClient) -> Result<Self> {
        let missing = |what: &str| PipelineError::Configuration(format!("extractor {what} is not set"));
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| missing("endpoint"))?;
        let api_key = config.api_key.clone().ok_or_else(|| missing("api key"))?;
        let deployment = config.deployment.as_deref().ok_or_else(|| missing("deployment"))?;

        Ok(Self {
            completions_url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint,
                urlencoding::encode(deployment),
                config.api_version
            ),
            api_key,
            system_prompt: config.system_prompt.clone(),
            http,
        })
    }

    fn request_body(&self, text: &str, schema: &OutputSchema) -> Result<String> {
        let request = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.name,
                    strict: true,
                    schema: schema.to_json_schema(),
                },
            },
        };
        Ok(serde_json::to_string(&request)?)
    }
}

/// Pull the record out of a completion body.
fn parse_completion(body: &str) -> Result<Value> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::SchemaExtraction(format!("unreadable completion: {e}")))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| PipelineError::SchemaExtraction("completion has no choices".to_string()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(PipelineError::SchemaExtraction(format!("model refused: {refusal}")));
    }

    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PipelineError::SchemaExtraction("completion content is empty".to_string()))?;

    serde_json::from_str(&content)
        .map_err(|e| PipelineError::SchemaExtraction(format!("completion content is not JSON: {e}")))
}

impl SchemaExtractor for AzureOpenAiExtractor {
    fn extract(&self, text: &str, schema: &OutputSchema) -> Result<Value> {
        let body = self.request_body(text, schema)?;
        debug!(schema = schema.name, bytes = body.len(), "sending chat completion");

        let response = self.http.execute(
            "chat completion",
            |agent| {
                agent
                    .post(&self.completions_url)
                    .set("api-key", &self.api_key)
                    .set("Content-Type", "application/json")
                    .send_string(&body)
            },
            |response| read_string("chat completion", response),
        )?;
        parse_completion(&response)
    }

    fn name(&self) -> &str {
        "AzureOpenAiExtractor"
    }
}
