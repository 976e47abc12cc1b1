use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persona_remix::{
    advisor::Advisor,
    config::{Credentials, RemixConfig},
    config_loader::ConfigLoader,
    http::{self, AppState},
    saved_messages::SavedMessageStore,
    server::RemixServer,
};
use rmcp::{transport::stdio, ServiceExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Persona-consistent project advice routed to Gemini or Claude.
#[derive(Parser, Debug)]
#[command(
    name = "persona-remix",
    version,
    about = "Persona-consistent project advice over HTTP or MCP, routed to Gemini or Claude",
    long_about = None
)]
struct Cli {
    /// Optional config file path (JSON). If omitted, falls back to ~/.config/persona-remix/config.json when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional saved-message store path (JSON). If omitted, uses ~/.local/share/persona-remix/saved_messages.json.
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP JSON API.
    Serve {
        /// Listen address; overrides `listen` from config.
        #[arg(long, env = "PERSONA_REMIX_LISTEN")]
        listen: Option<SocketAddr>,
    },
    /// Serve the MCP tools over stdio.
    Mcp,
}

fn init_tracing() {
    let default_filter = "persona_remix=info";
    // stderr keeps stdout free for the MCP stdio transport.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_filter))
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // - user config: ~/.config/persona-remix/config.json (or --config)
    // - project override: ./.persona-remix/config.json or ./.persona-remix.json
    let user_cfg_path = cli.config.or_else(RemixConfig::default_path);
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let cfg = ConfigLoader::new(user_cfg_path).load_for_dir(&cwd)?;

    let advisor = Advisor::from_config(&cfg, &Credentials::from_env());

    match cli.command {
        Command::Serve { listen } => {
            let store_path = cli
                .store
                .or_else(|| cfg.store_path())
                .context("no saved-message store path: set --store or saved_messages.path")?;
            info!("saved messages at {}", store_path.display());
            let state = AppState {
                advisor,
                store: SavedMessageStore::new(store_path),
            };
            http::serve(listen.unwrap_or(cfg.listen), state).await
        }
        Command::Mcp => {
            let service = RemixServer::new(advisor)
                .serve(stdio())
                .await
                .inspect_err(|e| {
                    error!("serving error: {e:?}");
                })?;
            service.waiting().await?;
            Ok(())
        }
    }
}
