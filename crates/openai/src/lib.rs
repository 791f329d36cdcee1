//! OpenAI chat-completion backend.
//!
//! Implements [`ChatModel`] with a blocking HTTP client. One call is one
//! request; nothing is retried.

use pptscript_core::{ChatMessage, ChatModel, Error, ModelSettings, Result, Role};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Assistant => "assistant",
    }
}

/// Client for the `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiChatModel {
    /// Create a client with an explicit key and the default base URL.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Create a client from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`.
    ///
    /// A missing key is not an error here; requests will fail with an
    /// authentication error instead, so the rest of the pipeline still runs.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = Self::new(api_key)?;
        match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(model.with_base_url(url)),
            _ => Ok(model),
        }
    }

    /// Point the client at another API root, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ChatModel for OpenAiChatModel {
    fn generate(&self, messages: &[ChatMessage], settings: &ModelSettings) -> Result<ChatMessage> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Generation(
                "authentication failed: OPENAI_API_KEY is not set".to_string(),
            ));
        }

        let body = CompletionRequest {
            model: &settings.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: wire_role(m.role),
                    content: &m.content,
                })
                .collect(),
            temperature: settings.temperature,
        };

        log::debug!("POST {} ({} messages)", self.endpoint(), messages.len());
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Generation(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let text = response
            .text()
            .map_err(|e| Error::Generation(format!("failed to read response: {}", e)))?;
        parse_completion(&text)
    }
}

/// Map a non-success status to a generation error.
fn status_error(status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Generation("authentication failed".to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => Error::Generation("rate limit exceeded".to_string()),
        _ => {
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            Error::Generation(format!("HTTP {}: {}", status, body))
        }
    }
}

/// Pull the first choice's content out of a response body.
fn parse_completion(body: &str) -> Result<ChatMessage> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| Error::Generation(format!("malformed response: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::Generation("malformed response: no completion content".to_string()))?;

    Ok(ChatMessage {
        role: Role::Assistant,
        content,
    })
}
