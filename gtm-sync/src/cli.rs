//! # CLI (Outermost Shell)
//!
//! Command-line surface of the tool: argument parsing, account
//! resolution, confirmation prompts and wiring of the core engines. All
//! remote work goes through [`GtmClient`]; all policy (batching, diffing,
//! copy/reset semantics) lives in `gtm_sync_core`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use std::collections::BTreeMap;
use tracing::{info, warn};

use gtm_sync_core::batch::BatchRunner;
use gtm_sync_core::config::{AccountConfig, Config};
use gtm_sync_core::copy::CopyEngine;
use gtm_sync_core::diff::DiffEngine;
use gtm_sync_core::reset::ResetEngine;
use gtm_sync_core::store::EntityStore;

use crate::client::GtmClient;
use crate::load_config::load_config;
use crate::render;

const DEFAULT_WORKSPACE_ID: &str = "3";

#[derive(Parser, Debug)]
#[clap(
    name = "gtm-sync",
    version,
    about = "List, diff, copy and reset tag-management entities across accounts"
)]
pub struct Cli {
    /// Path to the YAML config file with account aliases and rate limits.
    #[clap(long, global = true, default_value = "gtm-sync.yaml")]
    pub config: String,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the variables, triggers and tags of one account.
    List {
        #[clap(flatten)]
        account: AccountSelector,
    },
    /// Diff the entities of a source account against a target account.
    Diff {
        #[clap(flatten)]
        source: SourceSelector,
        #[clap(flatten)]
        target: TargetSelector,
        /// Also show entities that are identical on both sides.
        #[clap(long)]
        show_unchanged: bool,
    },
    /// Copy all entities from a source account into a target account.
    Copy {
        #[clap(flatten)]
        source: SourceSelector,
        #[clap(flatten)]
        target: TargetSelector,
        /// Reset (empty) the target account before copying.
        #[clap(long)]
        reset: bool,
    },
    /// Delete every entity in an account. The account must be marked
    /// resettable in the config.
    Reset {
        #[clap(flatten)]
        account: AccountSelector,
    },
}

/// Select an account either by config alias or by explicit identifiers.
#[derive(Args, Debug)]
pub struct AccountSelector {
    /// Account alias as defined in the config file.
    #[clap(long)]
    pub account_alias: Option<String>,
    /// Account ID (requires --container).
    #[clap(long, conflicts_with = "account_alias")]
    pub account: Option<String>,
    /// Container ID (requires --account).
    #[clap(long, conflicts_with = "account_alias")]
    pub container: Option<String>,
    /// Workspace ID (defaults to the service's default workspace).
    #[clap(long, conflicts_with = "account_alias")]
    pub workspace: Option<String>,
}

#[derive(Args, Debug)]
pub struct SourceSelector {
    /// Source account alias as defined in the config file.
    #[clap(long)]
    pub source_account_alias: Option<String>,
    /// Source account ID (requires --source-container).
    #[clap(long, conflicts_with = "source_account_alias")]
    pub source_account: Option<String>,
    /// Source container ID (requires --source-account).
    #[clap(long, conflicts_with = "source_account_alias")]
    pub source_container: Option<String>,
    /// Source workspace ID (defaults to the service's default workspace).
    #[clap(long, conflicts_with = "source_account_alias")]
    pub source_workspace: Option<String>,
}

#[derive(Args, Debug)]
pub struct TargetSelector {
    /// Target account alias as defined in the config file.
    #[clap(long)]
    pub target_account_alias: Option<String>,
    /// Target account ID (requires --target-container).
    #[clap(long, conflicts_with = "target_account_alias")]
    pub target_account: Option<String>,
    /// Target container ID (requires --target-account).
    #[clap(long, conflicts_with = "target_account_alias")]
    pub target_container: Option<String>,
    /// Target workspace ID (defaults to the service's default workspace).
    #[clap(long, conflicts_with = "target_account_alias")]
    pub target_workspace: Option<String>,
}

/// Resolves alias-or-explicit selector flags into an [`AccountConfig`].
///
/// Explicitly identified accounts carry no overrides and are treated as
/// resettable: naming the raw identifiers on the command line is taken as
/// deliberate.
fn resolve_account(
    config: &Config,
    alias: Option<&str>,
    account_id: Option<&str>,
    container_id: Option<&str>,
    workspace_id: Option<&str>,
) -> Result<AccountConfig> {
    if let Some(alias) = alias {
        let account = config.account(alias)?;
        return Ok(account.clone());
    }

    match (account_id, container_id) {
        (Some(account_id), Some(container_id)) => {
            let workspace_id = match workspace_id {
                Some(workspace_id) => workspace_id.to_string(),
                None => {
                    warn!(
                        account_id,
                        container_id,
                        default = DEFAULT_WORKSPACE_ID,
                        "No workspace given, using the default workspace"
                    );
                    DEFAULT_WORKSPACE_ID.to_string()
                }
            };
            Ok(AccountConfig {
                alias: account_id.to_string(),
                account_id: account_id.to_string(),
                container_id: container_id.to_string(),
                workspace_id,
                resettable: true,
                variable_overrides: BTreeMap::new(),
            })
        }
        _ => bail!("specify an account alias, or both an account ID and a container ID"),
    }
}

impl AccountSelector {
    fn resolve(&self, config: &Config) -> Result<AccountConfig> {
        resolve_account(
            config,
            self.account_alias.as_deref(),
            self.account.as_deref(),
            self.container.as_deref(),
            self.workspace.as_deref(),
        )
    }
}

impl SourceSelector {
    fn resolve(&self, config: &Config) -> Result<AccountConfig> {
        resolve_account(
            config,
            self.source_account_alias.as_deref(),
            self.source_account.as_deref(),
            self.source_container.as_deref(),
            self.source_workspace.as_deref(),
        )
    }
}

impl TargetSelector {
    fn resolve(&self, config: &Config) -> Result<AccountConfig> {
        resolve_account(
            config,
            self.target_account_alias.as_deref(),
            self.target_account.as_deref(),
            self.target_container.as_deref(),
            self.target_workspace.as_deref(),
        )
    }
}

async fn fetch_store(client: &GtmClient, account: &AccountConfig) -> Result<EntityStore> {
    let mut store = EntityStore::new(account.workspace(), account.resettable);
    store
        .fetch(client)
        .await
        .with_context(|| format!("failed to fetch entities of account '{}'", account.alias))?;
    Ok(store)
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("could not read confirmation from the terminal")
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::List { account } => {
            let account = account.resolve(&config)?;
            let client = GtmClient::new_from_env()?;
            info!(alias = %account.alias, "Listing account");
            let store = fetch_store(&client, &account).await?;
            render::list_account(&store);
        }
        Commands::Diff {
            source,
            target,
            show_unchanged,
        } => {
            let source = source.resolve(&config)?;
            let target = target.resolve(&config)?;
            let client = GtmClient::new_from_env()?;
            info!(source = %source.alias, target = %target.alias, "Diffing accounts");
            let source_store = fetch_store(&client, &source).await?;
            let target_store = fetch_store(&client, &target).await?;
            let diff = DiffEngine::new(show_unchanged).diff_accounts(&source_store, &target_store);
            render::account_diff(&diff, &source.alias, &target.alias, show_unchanged);
        }
        Commands::Copy {
            source,
            target,
            reset,
        } => {
            let source = source.resolve(&config)?;
            let target = target.resolve(&config)?;
            let client = GtmClient::new_from_env()?;
            let runner = BatchRunner::from_rate_limit(&config.rate_limit)?;

            let source_store = fetch_store(&client, &source).await?;
            let mut target_store = if reset {
                let mut target_store = fetch_store(&client, &target).await?;
                reset_with_confirmation(&client, &target, &mut target_store, runner.clone())
                    .await?;
                target_store
            } else {
                EntityStore::new(target.workspace(), target.resettable)
            };

            info!(source = %source.alias, target = %target.alias, "Copying account");
            let report = CopyEngine::new(&client, runner, &target)
                .copy_account(&source_store, &mut target_store)
                .await;
            render::copy_report(&report);
            if report.failed_count() > 0 {
                bail!("{} entities failed to copy", report.failed_count());
            }
        }
        Commands::Reset { account } => {
            let account = account.resolve(&config)?;
            let client = GtmClient::new_from_env()?;
            let runner = BatchRunner::from_rate_limit(&config.rate_limit)?;
            let mut store = fetch_store(&client, &account).await?;
            reset_with_confirmation(&client, &account, &mut store, runner).await?;
        }
    }

    Ok(())
}

/// Shows what would be deleted, asks for confirmation, then resets.
///
/// The resettable gate is checked up front so a protected account is
/// refused before the operator is even prompted.
async fn reset_with_confirmation(
    client: &GtmClient,
    account: &AccountConfig,
    store: &mut EntityStore,
    runner: BatchRunner,
) -> Result<()> {
    if !store.resettable() {
        bail!(
            "account '{}' is not marked resettable in the config; refusing to reset it",
            account.alias
        );
    }
    if store.is_empty() {
        info!(alias = %account.alias, "Account is already empty, nothing to reset");
        return Ok(());
    }

    render::list_account(store);
    let prompt = format!(
        "Delete ALL of the entities listed above from account '{}'?",
        account.alias
    );
    if !confirm(&prompt)? {
        bail!("reset of account '{}' aborted", account.alias);
    }

    info!(alias = %account.alias, "Resetting account");
    let report = ResetEngine::new(client, runner).reset(store).await?;
    render::delete_report(&report);
    if report.failed_count() > 0 {
        bail!("{} entities failed to delete", report.failed_count());
    }
    Ok(())
}
