use crate::backends::claude::ClaudeSettings;
use crate::backends::gemini::GeminiSettings;
use crate::backends::BackendId;
use crate::router::DEFAULT_TIMEOUT_SECS;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "persona-remix";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemixConfig {
    pub listen: SocketAddr,
    pub timeout_secs: u64,
    pub backend: BackendConfig,
    pub saved_messages: SavedMessagesConfig,
}

impl Default for RemixConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backend: BackendConfig::default(),
            saved_messages: SavedMessagesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub gemini: GeminiSettings,
    pub claude: ClaudeSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SavedMessagesConfig {
    /// Store file; falls back to [`RemixConfig::default_store_path`].
    pub path: Option<PathBuf>,
}

impl RemixConfig {
    pub fn default_path() -> Option<PathBuf> {
        // - $XDG_CONFIG_HOME/persona-remix/config.json
        // - ~/.config/persona-remix/config.json
        if let Some(base) = std::env::var_os("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(base).join(APP_DIR).join("config.json"));
        }
        let home = dirs::home_dir()?;
        Some(home.join(".config").join(APP_DIR).join("config.json"))
    }

    pub fn default_store_path() -> Option<PathBuf> {
        // - $XDG_DATA_HOME/persona-remix/saved_messages.json
        // - ~/.local/share/persona-remix/saved_messages.json
        if let Some(base) = std::env::var_os("XDG_DATA_HOME") {
            return Some(PathBuf::from(base).join(APP_DIR).join("saved_messages.json"));
        }
        let home = dirs::home_dir()?;
        Some(
            home.join(".local")
                .join("share")
                .join(APP_DIR)
                .join("saved_messages.json"),
        )
    }

    /// Read one config file as raw JSON; merging happens before typing.
    pub fn read_value(path: &Path) -> Result<serde_json::Value> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let v: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config JSON: {}", path.display()))?;
        if !v.is_object() {
            return Err(anyhow!(
                "invalid config {}: top level must be a JSON object",
                path.display()
            ));
        }
        Ok(v)
    }

    pub fn from_value(v: serde_json::Value) -> Result<Self> {
        let cfg: RemixConfig =
            serde_json::from_value(v).context("failed to interpret config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_value(Self::read_value(path)?)
            .with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than zero"));
        }
        if self.backend.gemini.model.trim().is_empty() {
            return Err(anyhow!("backend.gemini.model must not be empty"));
        }
        if self.backend.claude.model.trim().is_empty() {
            return Err(anyhow!("backend.claude.model must not be empty"));
        }
        if self.backend.claude.max_tokens == 0 {
            return Err(anyhow!("backend.claude.max_tokens must be greater than zero"));
        }
        Ok(())
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.saved_messages
            .path
            .clone()
            .or_else(Self::default_store_path)
    }
}

/// Backend credentials. Only ever read from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub gemini: Option<String>,
    pub claude: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Empty or whitespace-only values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |id: BackendId| {
            lookup(id.credential_var())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            gemini: read(BackendId::Gemini),
            claude: read(BackendId::Claude),
        }
    }
}

// Keys stay out of Debug output and therefore out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini", &self.gemini.as_ref().map(|_| "<set>"))
            .field("claude", &self.claude.as_ref().map(|_| "<set>"))
            .finish()
    }
}
