//! Configuration types, policy sources and path resolution for byok-compact.
//!
//! Settings are stored as TOML at the platform's XDG config path
//! (e.g. `~/.config/byok-compact/config.toml` on Linux), optionally overlaid
//! by a `byok-compact.toml` in the project tree.

mod loader;
mod paths;
mod resolve;
mod source;
mod types;

pub use resolve::{normalize_base_url, normalize_token};
pub use source::{policy_from_proxy_config, PolicySource, RemotePolicySource, StaticPolicySource};
pub use types::{AbridgedHistoryParams, Config, HistorySummaryPolicy, TriggerStrategy};

use anyhow::Result;
use std::sync::Arc;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }

    /// The policy source this config selects: the local `[history_summary]`
    /// table when present, the proxy's config endpoint otherwise.
    pub fn policy_source(&self) -> Result<Arc<dyn PolicySource>> {
        match &self.history_summary {
            Some(policy) => Ok(Arc::new(StaticPolicySource::new(Some(policy.clone())))),
            None => Ok(Arc::new(RemotePolicySource::from_config(self)?)),
        }
    }
}

#[cfg(test)]
mod tests;
