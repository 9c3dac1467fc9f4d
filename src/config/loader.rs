//! File loading and merging for byok-compact configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::Config;

/// Written to the global config path on first run.
const DEFAULT_CONFIG_TOML: &str = r#"completion_url = "{env:BYOK_COMPLETION_URL}"
api_token = "{env:BYOK_API_TOKEN}"

# Uncomment to use a local policy instead of the proxy's admin/api/config.
# [history_summary]
# enabled = true
# client_compaction_enabled = true
# trigger_strategy = "auto"
# trigger_on_history_size_chars = 400000
# trigger_on_context_ratio = 0.8
# provider_id = "anthropic"
# model = "claude-haiku-4-5"
# prompt = "Summarize the conversation so far."
# summary_node_request_message_template = "{summary}"
"#;

impl Config {
    /// Loads the global config from `~/.config/byok-compact/config.toml`.
    ///
    /// If no config file exists, creates one with `{env:VAR}` placeholders
    /// for the endpoint and token and returns it.
    pub(super) fn load_global() -> Result<Self> {
        Self::load_global_from(&Self::config_path()?)
    }

    pub(super) fn load_global_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG_TOML)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            let config: Config = toml::from_str(DEFAULT_CONFIG_TOML)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        Self::load_file(path)
    }

    /// Look for byok-compact.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        Self::load_project_from(std::env::current_dir()?)
    }

    pub(super) fn load_project_from(start: PathBuf) -> Result<Option<Config>> {
        let mut dir = start;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    fn load_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let history_summary = match (project.history_summary, global.history_summary) {
            (Some(proj), Some(glob)) => Some(proj.merged_over(glob)),
            (proj, glob) => proj.or(glob),
        };
        Config {
            completion_url: project.completion_url.or(global.completion_url),
            api_token: project.api_token.or(global.api_token),
            policy_ttl_ms: project.policy_ttl_ms.or(global.policy_ttl_ms),
            history_summary,
        }
    }
}
