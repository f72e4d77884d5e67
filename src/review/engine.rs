//! OpenAI-compatible review engine.
//!
//! The engine sends the diff to a chat-completions endpoint with a strict
//! JSON schema so the reply decodes directly into a [`ReviewResult`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::ReviewError;
use super::model::{BreakageRisk, ReviewResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f64 = 0.2;

const SAFETY_MESSAGE: &str = concat!(
    "the pull request content could not be processed due to safety settings; ",
    "make sure it does not contain sensitive or harmful content"
);

const SYSTEM_INSTRUCTION: &str = concat!(
    "You are an expert enterprise software architect and security engineer ",
    "reviewing a GitHub pull request diff.\n",
    "Focus on:\n",
    "- Security vulnerabilities: injection, XSS, insecure dependencies, secret leaks (severity 1-2)\n",
    "- Code quality and best practices: maintainability, readability, DRY, SOLID (severity 3-4)\n",
    "- Potential bugs and edge cases: logic errors, null handling, race conditions (severity 2-3)\n",
    "- Performance: inefficient algorithms, leaks, unnecessary queries (severity 2-3)\n",
    "- Breaking changes: the risk of regressions elsewhere in the system\n\n",
    "Grade the pull request from 0 to 100 and list issues with severities:\n",
    "1 (Critical): must be fixed before merge; security flaws or data corruption.\n",
    "2 (High): likely to cause production issues or significant bugs.\n",
    "3 (Medium): violates best practices or adds technical debt.\n",
    "4 (Low): minor issues, style nits, small improvements.\n",
    "5 (Informational): an observation that is not an issue.\n\n",
    "Analyse the entire diff and answer strictly with the provided JSON schema. ",
    "If no issues are found, return an empty issues array and a score of 100."
);

/// Produces a structured review for a unified diff.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewEngine: Send + Sync {
    /// Reviews `diff`, which is known to contain non-whitespace text.
    async fn review_diff(&self, diff: &str) -> Result<ReviewResult, ReviewError>;
}

/// Configuration for [`OpenAiReviewEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiReviewConfig {
    /// Base API URL (e.g., `https://api.openai.com/v1`).
    pub base_url: String,
    /// Model identifier sent in chat-completions requests.
    pub model: String,
    /// API key used for bearer authentication.
    pub api_key: Option<String>,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Additional request headers (primarily useful for deterministic tests).
    #[cfg(any(test, feature = "test-support"))]
    pub additional_headers: Vec<(String, String)>,
}

impl Default for OpenAiReviewConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            #[cfg(any(test, feature = "test-support"))]
            additional_headers: Vec::new(),
        }
    }
}

impl OpenAiReviewConfig {
    /// Constructs configuration with required API settings.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            timeout,
            #[cfg(any(test, feature = "test-support"))]
            additional_headers: Vec::new(),
        }
    }

    /// Adds one extra HTTP header.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn with_additional_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }
}

/// OpenAI-compatible review engine.
#[derive(Debug, Clone, Default)]
pub struct OpenAiReviewEngine {
    config: OpenAiReviewConfig,
}

impl OpenAiReviewEngine {
    /// Creates an engine from explicit configuration.
    #[must_use]
    pub const fn new(config: OpenAiReviewConfig) -> Self {
        Self { config }
    }

    fn extract_api_key(&self) -> Result<&str, ReviewError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ReviewError::ReviewEngine {
                message: concat!(
                    "AI API key is required (use --ai-api-key, ",
                    "DIFFSCOPE_AI_API_KEY, or OPENAI_API_KEY)"
                )
                .to_owned(),
            })
    }

    fn create_http_client(&self) -> Result<Client, ReviewError> {
        Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|error| ReviewError::ReviewEngine {
                message: format!("failed to configure AI HTTP client: {error}"),
            })
    }
}

#[async_trait]
impl ReviewEngine for OpenAiReviewEngine {
    async fn review_diff(&self, diff: &str) -> Result<ReviewResult, ReviewError> {
        let api_key = self.extract_api_key()?;
        let endpoint = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = ChatCompletionsRequest {
            model: self.config.model.as_str(),
            messages: vec![
                ChatCompletionsMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_owned(),
                },
                ChatCompletionsMessage {
                    role: "user",
                    content: format!("Review the following git diff:\n\n{diff}"),
                },
            ],
            temperature: TEMPERATURE,
            response_format: review_response_format(),
        };
        let client = self.create_http_client()?;
        #[cfg(any(test, feature = "test-support"))]
        let mut request_builder = client.post(endpoint).bearer_auth(api_key).json(&payload);
        #[cfg(not(any(test, feature = "test-support")))]
        let request_builder = client.post(endpoint).bearer_auth(api_key).json(&payload);
        #[cfg(any(test, feature = "test-support"))]
        for (name, value) in &self.config.additional_headers {
            request_builder = request_builder.header(name, value);
        }

        tracing::debug!(
            model = self.config.model.as_str(),
            diff_bytes = diff.len(),
            "requesting review"
        );

        let response = request_builder
            .send()
            .await
            .map_err(|error| ReviewError::ReviewEngine {
                message: format!("AI request transport failed: {error}"),
            })?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.map_or_else(
                |_| "(failed to read error response body)".to_owned(),
                |content| truncate_for_message(content.as_str(), 160),
            );
            return Err(ReviewError::ReviewEngine {
                message: format!("AI request failed with status {}: {body}", status.as_u16()),
            });
        }

        let response_payload: ChatCompletionsResponse =
            response
                .json()
                .await
                .map_err(|error| ReviewError::ReviewEngine {
                    message: format!("AI response JSON decoding failed: {error}"),
                })?;

        decode_review(&response_payload)
    }
}

fn decode_review(response: &ChatCompletionsResponse) -> Result<ReviewResult, ReviewError> {
    let choice = response
        .choices
        .first()
        .ok_or_else(|| ReviewError::ReviewEngine {
            message: "AI response did not contain any choices".to_owned(),
        })?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(ReviewError::ReviewEngine {
            message: SAFETY_MESSAGE.to_owned(),
        });
    }

    let content = choice
        .message
        .content
        .as_ref()
        .and_then(parse_content_value)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ReviewError::ReviewEngine {
            message: "AI response did not contain assistant text".to_owned(),
        })?;

    let result: ReviewResult =
        serde_json::from_str(content).map_err(|error| ReviewError::ReviewEngine {
            message: format!("AI review did not match the expected structure: {error}"),
        })?;
    result
        .validate()
        .map_err(|message| ReviewError::ReviewEngine { message })?;
    Ok(result)
}

fn review_response_format() -> Value {
    let risks: Vec<&str> = BreakageRisk::ALL.into_iter().map(BreakageRisk::label).collect();

    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "pull_request_review",
            "strict": true,
            "schema": {
                "type": "object",
                "additionalProperties": false,
                "required": ["summary", "overall_score", "breakage_risk", "issues"],
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "A 2-3 sentence summary of the changes and the overall quality of the pull request."
                    },
                    "overall_score": {
                        "type": "integer",
                        "description": "Quality score from 0 to 100, where 100 is production-ready."
                    },
                    "breakage_risk": {
                        "type": "string",
                        "enum": risks,
                        "description": "Risk that the change breaks existing functionality."
                    },
                    "issues": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "additionalProperties": false,
                            "required": ["severity", "file_path", "description", "suggestion"],
                            "properties": {
                                "severity": {
                                    "type": "integer",
                                    "description": "1 Critical, 2 High, 3 Medium, 4 Low, 5 Informational."
                                },
                                "file_path": {
                                    "type": "string",
                                    "description": "Full path of the file as seen in the diff."
                                },
                                "description": { "type": "string" },
                                "suggestion": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionsMessage>,
    temperature: f64,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Deserialize)]
struct ChatContentPart {
    text: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<ChatContent>,
}

fn parse_content_value(content: &ChatContent) -> Option<&str> {
    match content {
        ChatContent::Text(text) => Some(text.as_str()),
        ChatContent::Parts(parts) => parts
            .iter()
            .find_map(|part| part.text.as_deref().or(part.content.as_deref())),
    }
}

fn truncate_for_message(message: &str, max_chars: usize) -> String {
    let mut output = String::new();
    let mut chars = message.chars();

    for _ in 0..max_chars {
        let Some(character) = chars.next() else {
            return output;
        };
        output.push(character);
    }

    if chars.next().is_some() {
        output.push_str("...");
    }

    output
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
