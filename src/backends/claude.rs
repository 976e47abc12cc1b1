//! Anthropic Messages API adapter.

use super::{preview, BackendError, BackendId, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaudeSettings {
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl Default for ClaudeSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 1024,
        }
    }
}

#[derive(Clone)]
pub struct ClaudeBackend {
    client: Client,
    api_key: String,
    settings: ClaudeSettings,
}

impl ClaudeBackend {
    pub fn new(api_key: impl Into<String>, settings: ClaudeSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextGenerator for ClaudeBackend {
    fn id(&self) -> BackendId {
        BackendId::Claude
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| BackendError::Request {
                backend: BackendId::Claude,
                message: err.without_url().to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|err| BackendError::Request {
            backend: BackendId::Claude,
            message: format!("failed to read response body: {}", err.without_url()),
        })?;

        if !status.is_success() {
            return Err(BackendError::Status {
                backend: BackendId::Claude,
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&text).map_err(|err| BackendError::Malformed {
                backend: BackendId::Claude,
                message: format!("{err}: {}", preview(&text)),
            })?;

        extract_text(parsed)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn extract_text(response: MessagesResponse) -> Result<String, BackendError> {
    match response.stop_reason.as_deref() {
        Some("refusal") => {
            return Err(BackendError::Blocked {
                backend: BackendId::Claude,
                reason: "refusal".to_string(),
            })
        }
        Some(reason @ "max_tokens") => {
            return Err(BackendError::Truncated {
                backend: BackendId::Claude,
                reason: reason.to_string(),
            })
        }
        _ => {}
    }

    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();

    if text.trim().is_empty() {
        return Err(BackendError::Empty {
            backend: BackendId::Claude,
        });
    }

    Ok(text)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|w| match (w.error.kind, w.error.message) {
            (Some(kind), Some(msg)) => Some(format!("{kind}: {msg}")),
            (None, Some(msg)) => Some(msg),
            _ => None,
        })
        .unwrap_or_else(|| preview(body))
}
