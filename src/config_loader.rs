use crate::config::RemixConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(user_config_path: Option<PathBuf>) -> Self {
        Self { user_config_path }
    }

    pub fn user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn project_config_paths(project_root: &Path) -> [PathBuf; 2] {
        let a = project_root.join(".persona-remix").join("config.json");
        let b = project_root.join(".persona-remix.json");
        [a, b]
    }

    /// Load config for a project directory, merging the user-level file with a
    /// project override. Precedence: project overrides user, key by key.
    /// If neither exists, the built-in defaults are returned.
    pub fn load_for_dir(&self, project_root: &Path) -> Result<RemixConfig> {
        let user_cfg = match self.user_config_path() {
            Some(p) if p.exists() => Some(RemixConfig::read_value(p)?),
            _ => None,
        };

        let mut project_cfg: Option<Value> = None;
        for p in Self::project_config_paths(project_root) {
            if p.exists() {
                project_cfg = Some(RemixConfig::read_value(&p).with_context(|| {
                    format!("failed to load project config: {}", p.display())
                })?);
                break;
            }
        }

        let merged = match (user_cfg, project_cfg) {
            (None, None) => return Ok(RemixConfig::default()),
            (Some(u), None) => u,
            (None, Some(p)) => p,
            (Some(u), Some(p)) => merge_config(u, p),
        };
        RemixConfig::from_value(merged)
    }
}

fn merge_config(base: Value, overlay: Value) -> Value {
    // Objects merge by key, recursively; anything else is replaced.
    match (base, overlay) {
        (Value::Object(mut b), Value::Object(o)) => {
            for (k, v) in o {
                let merged = match b.remove(&k) {
                    Some(existing) => merge_config(existing, v),
                    None => v,
                };
                b.insert(k, merged);
            }
            Value::Object(b)
        }
        (_, overlay) => overlay,
    }
}
