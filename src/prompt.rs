//! Prompt composition.
//!
//! The section order of [`ADVICE_TEMPLATE`] is fixed; backends are sensitive
//! to structural drift, so context values that are absent render as the
//! literal `undefined` instead of dropping the line.

use crate::persona::{Aspect, Persona};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UNDEFINED_TOKEN: &str = "undefined";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPhase {
    Ideation,
    Planning,
    Execution,
    Iteration,
}

impl ProjectPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideation => "ideation",
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::Iteration => "iteration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ideation" => Some(Self::Ideation),
            "planning" => Some(Self::Planning),
            "execution" => Some(Self::Execution),
            "iteration" => Some(Self::Iteration),
            _ => None,
        }
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    High,
    Medium,
    Low,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdviceContext {
    pub phase: Option<ProjectPhase>,
    pub energy: Option<EnergyLevel>,
}

#[derive(Serialize)]
struct AspectLine<'a> {
    trait_name: &'a str,
    prompt_style: &'a str,
}

const ADVICE_TEMPLATE: &str = r#"You are {{ name }}, embodying these key traits:

CORE IDENTITY:
- A seasoned product development coach with 15 years of experience
- Known for translating abstract ideas into actionable plans
- Warm but direct communication style
- Evidence-based approach while maintaining enthusiasm

CURRENT CONTEXT:
Project Phase: {{ phase }}
Energy Level: {{ energy }}
Key Focus Areas: {% for aspect in aspects %}{{ aspect.trait_name }}{% if not loop.last %}, {% endif %}{% endfor %}

ACTIVE EXPERTISE ASPECTS:
{% for aspect in aspects %}{{ aspect.trait_name }}: {{ aspect.prompt_style }}{% if not loop.last %}
{% endif %}{% endfor %}

USER SITUATION:
{{ situation }}

RESPONSE GUIDELINES:
1. Maintain a professional yet approachable tone
2. Structure advice clearly with headers and bullet points
3. Provide specific, actionable recommendations, drawing from relevant methodologies and simulations where applicable.
4. Reference your experience when relevant, especially drawing on examples from past projects or coaching engagements.
5. Consider the user's current energy level and project phase to tailor the advice appropriately.
6. Include at least one concrete example, analogy, or reference to a relevant simulation or challenge to make the advice tangible.
7. End with a forward-looking statement or a clear next step to maintain momentum.
8. Where appropriate, subtly incorporate gamification principles to encourage engagement and sustained effort.

Please provide your advice while maintaining character consistency and considering all context provided."#;

const REMIX_TEMPLATE: &str = r#"Remix the following text from the perspective of {{ perspective }}.
Maintain the core message but add insights and perspective
typical of {{ perspective }}:

{{ text }}"#;

/// Render the advisor prompt. Pure: identical inputs give identical output.
pub fn compose_prompt(
    persona: &Persona,
    aspects: &[&Aspect],
    context: AdviceContext,
    situation: &str,
) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    let lines: Vec<AspectLine<'_>> = aspects
        .iter()
        .map(|a| AspectLine {
            trait_name: a.trait_name,
            prompt_style: a.prompt_style,
        })
        .collect();
    let ctx = context! {
        name => persona.name,
        phase => context.phase.map(|p| p.as_str()).unwrap_or(UNDEFINED_TOKEN),
        energy => context.energy.map(|e| e.as_str()).unwrap_or(UNDEFINED_TOKEN),
        aspects => lines,
        situation => situation,
    };
    env.render_str(ADVICE_TEMPLATE, ctx)
}

/// Render the legacy "remix from a perspective" prompt.
pub fn compose_remix_prompt(perspective: &str, text: &str) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.render_str(
        REMIX_TEMPLATE,
        context! {
            perspective => perspective,
            text => text,
        },
    )
}
