//! Uniform outcome shape and its normalization into response envelopes.

use crate::backends::BackendId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    ConfigurationError,
    BackendError,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ValidationError => "ValidationError",
            Self::ConfigurationError => "ConfigurationError",
            Self::BackendError => "BackendError",
            Self::InternalError => "InternalError",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceOutcome {
    Success { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl AdviceOutcome {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }
}

/// Which backend was asked for and which one actually served the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub requested: Option<String>,
    pub served_by: BackendId,
}

impl RoutingDecision {
    pub fn downgraded(&self) -> bool {
        self.requested.as_deref() == Some(BackendId::Claude.as_str())
            && self.served_by != BackendId::Claude
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedOutcome {
    pub decision: RoutingDecision,
    pub outcome: AdviceOutcome,
}

/// Backend-agnostic response envelope. Also the legacy remix wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remixed_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_used: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.remixed_text.is_some()
    }
}

pub fn normalize(routed: &RoutedOutcome, persona_used: Option<&str>) -> Envelope {
    match &routed.outcome {
        AdviceOutcome::Success { text } => Envelope {
            remixed_text: Some(text.clone()),
            error: None,
            model_used: Some(routed.decision.served_by.as_str().to_string()),
            persona_used: persona_used.map(str::to_string),
        },
        AdviceOutcome::Failure { message, .. } => Envelope {
            error: Some(message.clone()),
            ..Envelope::default()
        },
    }
}

/// Advisor wire shape: `{remixedText, success: true}` or
/// `{error, details, success: false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remixed_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspects_used: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub const ADVICE_FAILED: &str = "Failed to generate advice";

pub fn advisor_envelope(routed: &RoutedOutcome, aspects_used: &[&str]) -> AdvisorEnvelope {
    let envelope = normalize(routed, None);
    match envelope.remixed_text {
        Some(text) => AdvisorEnvelope {
            success: true,
            remixed_text: Some(text),
            model_used: envelope.model_used,
            aspects_used: Some(aspects_used.iter().map(|s| s.to_string()).collect()),
            error: None,
            details: None,
        },
        None => AdvisorEnvelope {
            success: false,
            remixed_text: None,
            model_used: None,
            aspects_used: None,
            error: Some(ADVICE_FAILED.to_string()),
            details: envelope.error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routed(outcome: AdviceOutcome) -> RoutedOutcome {
        RoutedOutcome {
            decision: RoutingDecision {
                requested: Some("claude".to_string()),
                served_by: BackendId::Gemini,
            },
            outcome,
        }
    }

    #[test]
    fn success_echoes_backend_actually_used() {
        let env = normalize(
            &routed(AdviceOutcome::Success {
                text: "advice".to_string(),
            }),
            Some("The Skeptic"),
        );
        assert_eq!(env.remixed_text.as_deref(), Some("advice"));
        assert_eq!(env.model_used.as_deref(), Some("gemini"));
        assert_eq!(env.persona_used.as_deref(), Some("The Skeptic"));
        assert!(env.error.is_none());
    }

    #[test]
    fn failure_carries_only_the_message() {
        let env = normalize(
            &routed(AdviceOutcome::failure(ErrorKind::BackendError, "connection refused")),
            Some("The Skeptic"),
        );
        assert_eq!(env.error.as_deref(), Some("connection refused"));
        assert!(env.remixed_text.is_none());
        assert!(env.model_used.is_none());
        assert!(env.persona_used.is_none());
    }

    #[test]
    fn advisor_failure_serializes_error_details_and_flag() {
        let env = advisor_envelope(
            &routed(AdviceOutcome::failure(ErrorKind::BackendError, "boom")),
            &["focuser"],
        );
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], ADVICE_FAILED);
        assert_eq!(v["details"], "boom");
        assert!(v.get("remixedText").is_none());
    }

    #[test]
    fn downgrade_is_detected_from_decision() {
        let d = routed(AdviceOutcome::failure(ErrorKind::BackendError, "x")).decision;
        assert!(d.downgraded());
        let served = RoutingDecision {
            requested: Some("claude".to_string()),
            served_by: BackendId::Claude,
        };
        assert!(!served.downgraded());
    }
}
