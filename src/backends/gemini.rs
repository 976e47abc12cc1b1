//! Gemini `generateContent` REST adapter.

use super::{preview, BackendError, BackendId, TextGenerator};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-thinking-exp-01-21";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 65536,
        }
    }
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    settings: GeminiSettings,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, settings: GeminiSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_p: self.settings.top_p,
                top_k: self.settings.top_k,
                max_output_tokens: self.settings.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    fn id(&self) -> BackendId {
        BackendId::Gemini
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        // Key goes in a header so it never shows up in reqwest's URL-bearing errors.
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|err| BackendError::Request {
                backend: BackendId::Gemini,
                message: err.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| BackendError::Request {
            backend: BackendId::Gemini,
            message: format!("failed to read response body: {}", err.without_url()),
        })?;

        if !status.is_success() {
            return Err(BackendError::Status {
                backend: BackendId::Gemini,
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|err| BackendError::Malformed {
                backend: BackendId::Gemini,
                message: format!("{err}: {}", preview(&body)),
            })?;

        extract_text(parsed)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    /// Thinking models mark reasoning parts with `thought: true`.
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Result<String, BackendError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(BackendError::Blocked {
            backend: BackendId::Gemini,
            reason,
        });
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(BackendError::Empty {
            backend: BackendId::Gemini,
        });
    };

    // Partial text under these finish reasons is never a usable answer.
    match candidate.finish_reason.as_deref() {
        Some(
            reason @ ("SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" | "RECITATION"
            | "LANGUAGE"),
        ) => {
            return Err(BackendError::Blocked {
                backend: BackendId::Gemini,
                reason: reason.to_string(),
            })
        }
        Some(reason @ "MAX_TOKENS") => {
            return Err(BackendError::Truncated {
                backend: BackendId::Gemini,
                reason: reason.to_string(),
            })
        }
        _ => {}
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(BackendError::Empty {
            backend: BackendId::Gemini,
        });
    }

    Ok(text)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .and_then(|w| match (w.error.status, w.error.message) {
            (Some(status), Some(msg)) if !status.is_empty() => Some(format!("{status}: {msg}")),
            (_, Some(msg)) => Some(msg),
            _ => None,
        })
        .unwrap_or_else(|| preview(body))
}
