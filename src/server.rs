use crate::advisor::{AdviceRequest, Advisor, RemixRequest, RequestError};
use crate::http::AspectSummary;
use crate::outcome::{AdvisorEnvelope, Envelope};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};

/// Input parameters for the advise tool.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct AdviseArgs {
    /// Free-text description of the project situation
    #[serde(default)]
    pub text: Option<String>,

    /// Advisor aspect ids to activate (see the `aspects` tool), e.g. ["focuser"]
    #[serde(default)]
    pub aspects: Vec<String>,

    /// Backend to use (gemini|claude). Claude is used only when configured.
    #[serde(default)]
    pub model: Option<String>,

    /// ideation|planning|execution|iteration
    #[serde(default, rename = "projectPhase")]
    pub project_phase: Option<String>,

    /// high|medium|low
    #[serde(default, rename = "energyLevel")]
    pub energy_level: Option<String>,
}

/// Input parameters for the remix tool.
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct RemixArgs {
    /// Text to rewrite
    #[serde(default)]
    pub text: Option<String>,

    /// Perspective id (skeptic|visionary|academic|pragmatist|optimist) or any free-form name
    #[serde(default)]
    pub persona: Option<String>,

    /// Backend to use (default: gemini)
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectsOutput {
    pub persona: &'static str,
    pub aspects: Vec<AspectSummary>,
}

#[derive(Clone)]
pub struct RemixServer {
    tool_router: ToolRouter<RemixServer>,
    advisor: Advisor,
}

impl RemixServer {
    pub fn new(advisor: Advisor) -> Self {
        Self {
            tool_router: Self::tool_router(),
            advisor,
        }
    }

    pub async fn run_advise_internal(&self, args: AdviseArgs) -> Result<AdvisorEnvelope, McpError> {
        let advice = AdviceRequest {
            text: args.text,
            aspects: Some(args.aspects),
            model: args.model,
            project_phase: args.project_phase,
            energy_level: args.energy_level,
        }
        .validate()
        .map_err(invalid_params)?;
        Ok(self.advisor.advise(&advice).await.envelope())
    }

    pub async fn run_remix_internal(&self, args: RemixArgs) -> Result<Envelope, McpError> {
        let remix = RemixRequest {
            text: args.text,
            persona: args.persona,
            model: args.model,
        }
        .validate()
        .map_err(invalid_params)?;
        Ok(self.advisor.remix(&remix).await.envelope())
    }

    pub fn aspects_output(&self) -> AspectsOutput {
        let persona = self.advisor.registry().persona();
        AspectsOutput {
            persona: persona.name,
            aspects: persona
                .aspects
                .iter()
                .map(|a| AspectSummary {
                    id: a.id,
                    trait_name: a.trait_name,
                    description: a.description,
                })
                .collect(),
        }
    }
}

fn invalid_params(err: RequestError) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

fn to_result<T: Serialize>(out: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string(out)
        .map_err(|e| McpError::internal_error(format!("failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[tool_router]
impl RemixServer {
    /// Persona-consistent project advice through the selected aspects.
    #[tool(
        name = "advise",
        description = "Get persona-consistent project advice focused through one or more advisor aspects"
    )]
    async fn advise(
        &self,
        Parameters(args): Parameters<AdviseArgs>,
    ) -> Result<CallToolResult, McpError> {
        let out = self.run_advise_internal(args).await?;
        to_result(&out)
    }

    #[tool(name = "remix", description = "Rewrite text from a named perspective")]
    async fn remix(
        &self,
        Parameters(args): Parameters<RemixArgs>,
    ) -> Result<CallToolResult, McpError> {
        let out = self.run_remix_internal(args).await?;
        to_result(&out)
    }

    #[tool(name = "aspects", description = "List the advisor persona and its selectable aspects")]
    async fn aspects(&self) -> Result<CallToolResult, McpError> {
        to_result(&self.aspects_output())
    }
}

#[tool_handler]
impl ServerHandler for RemixServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides 'advise', 'remix' and 'aspects' tools backed by a project-advisor persona routed to Gemini or Claude."
                    .to_string(),
            ),
        }
    }
}
