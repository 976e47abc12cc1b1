//! Text-generation backends behind one capability.
//!
//! Each adapter performs exactly one outbound call per `generate` and maps
//! its provider's failures into [`BackendError`].

pub mod claude;
pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Gemini,
    Claude,
}

impl BackendId {
    pub const ALL: [BackendId; 2] = [BackendId::Gemini, BackendId::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Claude => "claude",
        }
    }

    /// Environment variable holding this backend's credential.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Claude => "CLAUDE_API_KEY",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{backend} request failed: {message}")]
    Request { backend: BackendId, message: String },
    #[error("{backend} returned HTTP {status}: {message}")]
    Status {
        backend: BackendId,
        status: u16,
        message: String,
    },
    #[error("{backend} blocked the prompt: {reason}")]
    Blocked { backend: BackendId, reason: String },
    #[error("{backend} returned a malformed response: {message}")]
    Malformed { backend: BackendId, message: String },
    #[error("{backend} returned no text")]
    Empty { backend: BackendId },
    #[error("{backend} stopped before finishing: {reason}")]
    Truncated { backend: BackendId, reason: String },
    #[error("{backend} request timed out after {secs}s")]
    Timeout { backend: BackendId, secs: u64 },
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn id(&self) -> BackendId;

    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Shorten provider error bodies before they end up in messages.
pub(crate) fn preview(s: &str) -> String {
    const MAX: usize = 200;
    let s = s.trim();
    if s.len() <= MAX {
        return s.to_string();
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert!(p.len() <= 203);
    }

    #[test]
    fn backend_error_messages_name_the_backend() {
        let e = BackendError::Status {
            backend: BackendId::Claude,
            status: 529,
            message: "overloaded".to_string(),
        };
        assert_eq!(e.to_string(), "claude returned HTTP 529: overloaded");
    }
}
