//! Where the compaction policy comes from.
//!
//! The engine asks a [`PolicySource`] for a fresh snapshot on every request.
//! [`StaticPolicySource`] serves the `[history_summary]` table of the local
//! config; [`RemotePolicySource`] fetches the proxy's `admin/api/config`
//! document and caches successful fetches for a short TTL.

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::resolve::{normalize_base_url, normalize_token};
use super::types::{Config, HistorySummaryPolicy};
use crate::clock::{Clock, SystemClock};
use crate::constants::PROXY_CONFIG_ENDPOINT;

/// Provides the current compaction policy.
#[async_trait::async_trait]
pub trait PolicySource: Send + Sync {
    /// Returns the current policy, `None` when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy could not be obtained.
    async fn fetch(&self) -> Result<Option<HistorySummaryPolicy>>;
}

/// A fixed policy.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicySource {
    policy: Option<HistorySummaryPolicy>,
}

impl StaticPolicySource {
    pub fn new(policy: Option<HistorySummaryPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait::async_trait]
impl PolicySource for StaticPolicySource {
    async fn fetch(&self) -> Result<Option<HistorySummaryPolicy>> {
        Ok(self.policy.clone())
    }
}

/// Last successfully fetched policy and when it was fetched.
#[derive(Debug, Clone)]
struct CachedPolicy {
    fetched_at_ms: i64,
    policy: Option<HistorySummaryPolicy>,
}

/// Short-lived snapshot cache. Only successful fetches are stored.
pub(crate) struct PolicyCache {
    ttl_ms: u64,
    entry: Mutex<Option<CachedPolicy>>,
}

impl PolicyCache {
    pub(crate) fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entry: Mutex::new(None),
        }
    }

    /// The cached snapshot if it is younger than the TTL. A zero TTL
    /// disables caching.
    pub(crate) fn get(&self, now_ms: i64) -> Option<Option<HistorySummaryPolicy>> {
        if self.ttl_ms == 0 {
            return None;
        }
        let entry = self.entry.lock().ok()?;
        let cached = entry.as_ref()?;
        let age = now_ms.saturating_sub(cached.fetched_at_ms);
        (age >= 0 && (age as u64) < self.ttl_ms).then(|| cached.policy.clone())
    }

    pub(crate) fn put(&self, now_ms: i64, policy: Option<HistorySummaryPolicy>) {
        if let Ok(mut entry) = self.entry.lock() {
            *entry = Some(CachedPolicy {
                fetched_at_ms: now_ms,
                policy,
            });
        }
    }
}

/// Fetches the policy from the proxy's config endpoint.
pub struct RemotePolicySource {
    client: reqwest::Client,
    url: String,
    token: String,
    cache: PolicyCache,
    clock: Arc<dyn Clock>,
}

impl RemotePolicySource {
    /// Creates a source for `<base_url>admin/api/config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or the token is blank.
    pub fn new(base_url: &str, token: &str, ttl_ms: u64) -> Result<Self> {
        let base = normalize_base_url(base_url).context("No completion URL configured")?;
        let token = normalize_token(token).context("No API token configured")?;
        Ok(Self {
            client: reqwest::Client::new(),
            url: format!("{base}{PROXY_CONFIG_ENDPOINT}"),
            token,
            cache: PolicyCache::new(ttl_ms),
            clock: Arc::new(SystemClock),
        })
    }

    /// Creates a source from the loaded config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base = config
            .base_url()
            .context("No completion URL found. Set completion_url in config.toml")?;
        let token = config
            .resolve_api_token()
            .context("No API token found. Set BYOK_API_TOKEN or api_token in config.toml")?;
        Self::new(&base, &token, config.policy_ttl_ms())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait::async_trait]
impl PolicySource for RemotePolicySource {
    async fn fetch(&self) -> Result<Option<HistorySummaryPolicy>> {
        let now = self.clock.now_ms();
        if let Some(policy) = self.cache.get(now) {
            return Ok(policy);
        }

        debug!(url = %self.url, "fetching proxy config");
        let resp = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.url))?;
        let status = resp.status();
        anyhow::ensure!(status.is_success(), "Proxy config request failed: {status}");

        let document: Value = resp
            .json()
            .await
            .context("Proxy config is not valid JSON")?;
        let policy = policy_from_proxy_config(&document)?;
        self.cache.put(now, policy.clone());
        Ok(policy)
    }
}

/// Extracts the `history_summary` object of a proxy config document.
///
/// # Errors
///
/// Returns an error if the object is present but does not match the policy
/// schema.
pub fn policy_from_proxy_config(document: &Value) -> Result<Option<HistorySummaryPolicy>> {
    match document.get("history_summary") {
        Some(hs @ Value::Object(_)) => serde_json::from_value(hs.clone())
            .map(Some)
            .context("Invalid history_summary policy"),
        _ => Ok(None),
    }
}
