//! Process configuration (§6), loaded once at startup from the environment
//! (optionally seeded by a `.env` file, mirroring the upstream sidecar's
//! `Settings.Config.env_file = ".env"`) and never mutated afterwards.
//!
//! An invalid or missing required variable aborts the process before a
//! socket is bound (§7 "Startup failures ... abort the process") — see
//! [`SidecarConfig::load`].

use serde::Deserialize;
use std::time::Duration;

use sidecar_upstream::BlockchainId;

/// Mirrors the `§6 Configuration` table. Field names are matched against
/// their upper-cased env var form by `envy` (e.g. `node_blockchain` reads
/// `NODE_BLOCKCHAIN`).
#[derive(Debug, Clone, Deserialize)]
pub struct SidecarConfig {
    pub node_blockchain: String,
    pub node_url: String,
    pub node_token: String,
    pub redis_host: String,

    #[serde(default = "default_limit_default")]
    pub limit_default: u64,

    #[serde(default = "default_limit_interval")]
    pub limit_interval: u64,

    #[serde(default = "default_environment")]
    pub environment: String,

    pub sidecar_token: Option<String>,

    /// Comma-separated peer base URLs. `envy` deserializes env vars as
    /// plain strings; splitting into the `set<string>` §3 describes is
    /// [`SidecarConfig::peer_urls`]'s job, done once at startup.
    #[serde(default)]
    pub sidecar_urls: String,

    #[serde(default = "default_sync_interval")]
    pub sidecar_limit_sync_interval: u64,

    pub sentry_dsn: Option<String>,
}

fn default_limit_default() -> u64 {
    10_000
}

fn default_limit_interval() -> u64 {
    86_400
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_sync_interval() -> u64 {
    1_000
}

impl SidecarConfig {
    /// Loads `.env` (if present, silently ignored otherwise) then
    /// deserializes the process environment. Returns an error describing
    /// the first missing/invalid variable; the caller is expected to abort.
    pub fn load() -> Result<Self, envy::Error> {
        let _ = dotenvy::dotenv();
        envy::from_env()
    }

    pub fn blockchain_id(&self) -> BlockchainId {
        BlockchainId::from_name(&self.node_blockchain)
    }

    pub fn limit_interval(&self) -> Duration {
        Duration::from_secs(self.limit_interval)
    }

    /// Parsed, whitespace-trimmed peer URLs; empty entries are dropped so a
    /// trailing comma in `SIDECAR_URLS` doesn't produce a broadcast target.
    pub fn peer_urls(&self) -> Vec<String> {
        self.sidecar_urls
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn api_key_hash(&self) -> String {
        format!("{}/api_keys", self.blockchain_id().name())
    }

    pub fn limits_prefix(&self) -> String {
        format!("{}/limits", self.blockchain_id().name())
    }

    pub fn cache_prefix(&self) -> String {
        format!("{}/cache", self.blockchain_id().name())
    }
}
