//! Request validation and the advice pipeline:
//! resolve aspects, compose the prompt, route, and hand back a routed outcome.

use crate::backends::claude::ClaudeBackend;
use crate::backends::gemini::GeminiBackend;
use crate::backends::{BackendId, TextGenerator};
use crate::config::{Credentials, RemixConfig};
use crate::outcome::{
    advisor_envelope, normalize, AdviceOutcome, AdvisorEnvelope, Envelope, ErrorKind,
    RoutedOutcome, RoutingDecision,
};
use crate::persona::{remix_perspective, PersonaRegistry};
use crate::prompt::{compose_prompt, compose_remix_prompt, AdviceContext, EnergyLevel, ProjectPhase};
use crate::resolver::resolve_aspects;
use crate::router::ModelRouter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const MISSING_FIELDS: &str = "Missing required fields";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Missing required field: text")]
    MissingText,
    #[error("Invalid projectPhase '{0}' (expected ideation, planning, execution or iteration)")]
    InvalidPhase(String),
    #[error("Invalid energyLevel '{0}' (expected high, medium or low)")]
    InvalidEnergy(String),
}

/// Advisor request as it arrives on the wire. Everything is optional here so
/// that missing fields surface as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub aspects: Option<Vec<String>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub project_phase: Option<String>,
    #[serde(default)]
    pub energy_level: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advice {
    pub situation: String,
    pub aspect_ids: Vec<String>,
    pub model: Option<String>,
    pub context: AdviceContext,
}

impl AdviceRequest {
    pub fn validate(self) -> Result<Advice, RequestError> {
        let situation = self
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(RequestError::MissingFields)?;
        let aspect_ids = self
            .aspects
            .filter(|a| !a.is_empty())
            .ok_or(RequestError::MissingFields)?;

        let phase = match non_blank(self.project_phase) {
            Some(p) => Some(ProjectPhase::parse(&p).ok_or(RequestError::InvalidPhase(p))?),
            None => None,
        };
        let energy = match non_blank(self.energy_level) {
            Some(e) => Some(EnergyLevel::parse(&e).ok_or(RequestError::InvalidEnergy(e))?),
            None => None,
        };

        Ok(Advice {
            situation,
            aspect_ids,
            model: non_blank(self.model),
            context: AdviceContext { phase, energy },
        })
    }
}

/// Legacy remix request: `{ text, persona?, model? }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemixRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remix {
    pub text: String,
    pub persona: Option<String>,
    pub model: String,
}

impl RemixRequest {
    pub fn validate(self) -> Result<Remix, RequestError> {
        let text = self
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or(RequestError::MissingText)?;
        Ok(Remix {
            text,
            persona: non_blank(self.persona),
            model: non_blank(self.model).unwrap_or_else(|| BackendId::Gemini.as_str().to_string()),
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone)]
pub struct AdviceResponse {
    pub routed: RoutedOutcome,
    pub aspects_used: Vec<&'static str>,
}

impl AdviceResponse {
    pub fn envelope(&self) -> AdvisorEnvelope {
        advisor_envelope(&self.routed, &self.aspects_used)
    }
}

#[derive(Debug, Clone)]
pub struct RemixResponse {
    pub routed: RoutedOutcome,
    pub persona_used: String,
}

impl RemixResponse {
    pub fn envelope(&self) -> Envelope {
        normalize(&self.routed, Some(&self.persona_used))
    }
}

/// The core engine shared by the HTTP and MCP surfaces.
#[derive(Clone)]
pub struct Advisor {
    registry: &'static PersonaRegistry,
    router: ModelRouter,
}

impl Advisor {
    pub fn new(registry: &'static PersonaRegistry, router: ModelRouter) -> Self {
        Self { registry, router }
    }

    /// Build the HTTP adapters for every backend with a credential.
    pub fn from_config(cfg: &RemixConfig, creds: &Credentials) -> Self {
        let gemini = creds.gemini.as_ref().map(|key| {
            Arc::new(GeminiBackend::new(key.clone(), cfg.backend.gemini.clone()))
                as Arc<dyn TextGenerator>
        });
        let claude = creds.claude.as_ref().map(|key| {
            Arc::new(ClaudeBackend::new(key.clone(), cfg.backend.claude.clone()))
                as Arc<dyn TextGenerator>
        });
        if gemini.is_none() {
            warn!("GEMINI_API_KEY is not set; advice requests will fail until it is configured");
        }
        info!(
            gemini = gemini.is_some(),
            claude = claude.is_some(),
            timeout_secs = cfg.timeout_secs,
            "backends configured"
        );
        let router = ModelRouter::new(gemini, claude, Duration::from_secs(cfg.timeout_secs));
        Self::new(PersonaRegistry::global(), router)
    }

    pub fn registry(&self) -> &'static PersonaRegistry {
        self.registry
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub async fn advise(&self, advice: &Advice) -> AdviceResponse {
        let aspects = resolve_aspects(self.registry, &advice.aspect_ids);
        let aspects_used: Vec<&'static str> = aspects.iter().map(|a| a.id).collect();

        let prompt = match compose_prompt(
            self.registry.persona(),
            &aspects,
            advice.context,
            &advice.situation,
        ) {
            Ok(p) => p,
            Err(err) => {
                return AdviceResponse {
                    routed: self.render_failure(advice.model.as_deref(), err),
                    aspects_used,
                }
            }
        };
        debug!(aspects = ?aspects_used, prompt_chars = prompt.chars().count(), "composed advice prompt");

        let routed = self.router.route(advice.model.as_deref(), &prompt).await;
        AdviceResponse {
            routed,
            aspects_used,
        }
    }

    pub async fn remix(&self, remix: &Remix) -> RemixResponse {
        let persona_name = self.registry.persona().name;
        let (perspective, persona_used) = match remix.persona.as_deref() {
            Some(id) => (
                id,
                remix_perspective(id)
                    .map(|p| p.name.to_string())
                    .unwrap_or_else(|| id.to_string()),
            ),
            None => (persona_name, persona_name.to_string()),
        };

        let routed = match compose_remix_prompt(perspective, &remix.text) {
            Ok(prompt) => {
                debug!(perspective, prompt_chars = prompt.chars().count(), "composed remix prompt");
                self.router.route(Some(remix.model.as_str()), &prompt).await
            }
            Err(err) => self.render_failure(Some(remix.model.as_str()), err),
        };

        RemixResponse {
            routed,
            persona_used,
        }
    }

    fn render_failure(&self, requested: Option<&str>, err: minijinja::Error) -> RoutedOutcome {
        error!("prompt render failed: {err}");
        RoutedOutcome {
            decision: RoutingDecision {
                requested: requested.map(str::to_string),
                served_by: self.router.select(requested),
            },
            outcome: AdviceOutcome::failure(
                ErrorKind::InternalError,
                format!("prompt render failed: {err}"),
            ),
        }
    }
}
