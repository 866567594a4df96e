//! Account and rate-limit configuration consumed by the engines.
//!
//! The configuration is an explicitly constructed value handed to whoever
//! needs it; nothing here is process-global. The CLI crate owns parsing the
//! YAML file into [`Config`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::model::Workspace;

/// One aliased account entry from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub alias: String,
    pub account_id: String,
    pub container_id: String,
    pub workspace_id: String,
    /// Gates destructive operations. Defaults to false so an account must
    /// opt in before reset is allowed to touch it.
    #[serde(default)]
    pub resettable: bool,
    /// Constant-variable name to replacement value, applied while copying
    /// *into* this account.
    #[serde(default)]
    pub variable_overrides: BTreeMap<String, String>,
}

impl AccountConfig {
    pub fn workspace(&self) -> Workspace {
        Workspace::new(
            self.account_id.clone(),
            self.container_id.clone(),
            self.workspace_id.clone(),
        )
    }
}

/// "N requests per M milliseconds" for the batch runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default = "default_requests_per_batch")]
    pub requests_per_batch: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_requests_per_batch() -> usize {
    8
}

fn default_batch_delay_ms() -> u64 {
    4000
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_batch: default_requests_per_batch(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl RateLimit {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub rate_limit: RateLimit,
}

impl Config {
    /// Looks up an account by its alias.
    pub fn account(&self, alias: &str) -> Result<&AccountConfig, SyncError> {
        self.accounts
            .iter()
            .find(|account| account.alias == alias)
            .ok_or_else(|| SyncError::UnknownAccount {
                alias: alias.to_string(),
            })
    }

    pub fn trace_loaded(&self) {
        info!(
            accounts = self.accounts.len(),
            requests_per_batch = self.rate_limit.requests_per_batch,
            batch_delay_ms = self.rate_limit.batch_delay_ms,
            "Loaded config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}
