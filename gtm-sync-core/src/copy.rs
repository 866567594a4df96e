//! Dependency-aware account copy.
//!
//! Copies every variable, trigger and tag from a source account into a
//! target account. Stages run strictly in sequence (variables, then
//! triggers, then tags) because a tag's `firingTriggerId` list can only be
//! rewritten once the referenced triggers exist in the target account and
//! their remote-assigned identifiers are known. The source→target trigger
//! identifier remap table is built while triggers are copied and consumed
//! while tags are copied; it lives for one [`CopyEngine::copy_account`]
//! call and is discarded with it.
//!
//! An individual create failure is captured into the report and never halts
//! the batch or the later stages: `copy_account` always returns a report
//! covering every source entity.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::batch::BatchRunner;
use crate::config::AccountConfig;
use crate::contract::TagManagerClient;
use crate::error::RemoteError;
use crate::model::{Entity, Tag, Trigger, Variable, CONSTANT_VARIABLE_TYPE};
use crate::store::EntityStore;

/// Outcome of one attempted entity copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Created { target_id: String },
    Failed { error: RemoteError },
}

/// One report row: which source entity was attempted and how it went.
#[derive(Debug, Clone)]
pub struct CopiedEntity {
    pub source_id: String,
    pub name: String,
    pub outcome: CopyOutcome,
}

impl CopiedEntity {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, CopyOutcome::Created { .. })
    }
}

/// Full per-entity outcome record for one copy operation, partitioned by
/// kind. Covers every source entity regardless of success.
#[derive(Debug, Clone, Default)]
pub struct CopyReport {
    pub variables: Vec<CopiedEntity>,
    pub triggers: Vec<CopiedEntity>,
    pub tags: Vec<CopiedEntity>,
}

impl CopyReport {
    pub fn failed_count(&self) -> usize {
        self.variables
            .iter()
            .chain(&self.triggers)
            .chain(&self.tags)
            .filter(|entity| !entity.succeeded())
            .count()
    }
}

pub struct CopyEngine<'a, C> {
    client: &'a C,
    runner: BatchRunner,
    /// Constant-variable name → replacement value for the target account.
    overrides: BTreeMap<String, String>,
}

impl<'a, C: TagManagerClient> CopyEngine<'a, C> {
    /// `target_account` supplies the per-account constant overrides; the
    /// target workspace itself comes from the store passed to
    /// [`copy_account`](Self::copy_account).
    pub fn new(client: &'a C, runner: BatchRunner, target_account: &AccountConfig) -> Self {
        Self {
            client,
            runner,
            overrides: target_account.variable_overrides.clone(),
        }
    }

    /// Copies all entities from `source` into `target`'s account.
    ///
    /// Created entities are inserted into the target store under the
    /// identifier the remote service returned.
    pub async fn copy_account(
        &self,
        source: &EntityStore,
        target: &mut EntityStore,
    ) -> CopyReport {
        info!(
            source = %source.workspace().parent(),
            target = %target.workspace().parent(),
            "Copying account"
        );
        let variables = self.copy_variables(source, target).await;
        let (triggers, trigger_remap) = self.copy_triggers(source, target).await;
        let tags = self.copy_tags(source, target, &trigger_remap).await;
        let report = CopyReport {
            variables,
            triggers,
            tags,
        };
        info!(failed = report.failed_count(), "Copy finished");
        report
    }

    async fn copy_variables(
        &self,
        source: &EntityStore,
        target: &mut EntityStore,
    ) -> Vec<CopiedEntity> {
        let workspace = target.workspace().clone();
        let items: Vec<Variable> = source.variables.values().cloned().collect();
        info!(count = items.len(), "Copying variables");

        let results = self
            .runner
            .run(items, |variable| {
                let workspace = workspace.clone();
                async move {
                    let source_id = variable.id().unwrap_or_default().to_string();
                    let name = variable.name.clone();
                    debug!(source_id = %source_id, name = %name, "Copying variable");

                    let mut request = variable;
                    request.strip_remote_fields();
                    request.retarget(&workspace);
                    if request.type_ == CONSTANT_VARIABLE_TYPE {
                        if let Some(value) = self.overrides.get(&name) {
                            info!(name = %name, "Overriding constant value for target account");
                            request.set_value_parameter(value);
                        }
                    }

                    let result = self.client.create_variable(&workspace, request).await;
                    (source_id, name, result)
                }
            })
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (source_id, name, result) in results {
            match result {
                Ok(created) => {
                    let target_id = created.id().unwrap_or_default().to_string();
                    target.insert_variable(created);
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Created { target_id },
                    });
                }
                Err(error) => {
                    warn!(source_id = %source_id, name = %name, %error, "Variable copy failed");
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Failed { error },
                    });
                }
            }
        }
        outcomes
    }

    async fn copy_triggers(
        &self,
        source: &EntityStore,
        target: &mut EntityStore,
    ) -> (Vec<CopiedEntity>, BTreeMap<String, String>) {
        let workspace = target.workspace().clone();
        let items: Vec<Trigger> = source.triggers.values().cloned().collect();
        info!(count = items.len(), "Copying triggers");

        let results = self
            .runner
            .run(items, |trigger| {
                let workspace = workspace.clone();
                async move {
                    let source_id = trigger.id().unwrap_or_default().to_string();
                    let name = trigger.name.clone();
                    debug!(source_id = %source_id, name = %name, "Copying trigger");

                    let mut request = trigger;
                    request.strip_remote_fields();
                    request.retarget(&workspace);

                    let result = self.client.create_trigger(&workspace, request).await;
                    (source_id, name, result)
                }
            })
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut remap = BTreeMap::new();
        for (source_id, name, result) in results {
            match result {
                Ok(created) => {
                    let target_id = created.id().unwrap_or_default().to_string();
                    remap.insert(source_id.clone(), target_id.clone());
                    target.insert_trigger(created);
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Created { target_id },
                    });
                }
                Err(error) => {
                    warn!(source_id = %source_id, name = %name, %error, "Trigger copy failed");
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Failed { error },
                    });
                }
            }
        }
        (outcomes, remap)
    }

    async fn copy_tags(
        &self,
        source: &EntityStore,
        target: &mut EntityStore,
        trigger_remap: &BTreeMap<String, String>,
    ) -> Vec<CopiedEntity> {
        let workspace = target.workspace().clone();
        let items: Vec<Tag> = source.tags.values().cloned().collect();
        info!(count = items.len(), "Copying tags");

        let results = self
            .runner
            .run(items, |tag| {
                let workspace = workspace.clone();
                async move {
                    let source_id = tag.id().unwrap_or_default().to_string();
                    let name = tag.name.clone();
                    debug!(source_id = %source_id, name = %name, "Copying tag");

                    let mut request = tag;
                    request.strip_remote_fields();
                    request.retarget(&workspace);
                    // A firing trigger that failed to copy has no mapping;
                    // the entry is dropped and the tag is still created.
                    let remapped: Vec<String> = request
                        .firing_trigger_id
                        .iter()
                        .filter_map(|trigger_id| {
                            let mapped = trigger_remap.get(trigger_id).cloned();
                            if mapped.is_none() {
                                warn!(
                                    name = %name,
                                    trigger_id = %trigger_id,
                                    "No target trigger for firing trigger reference, dropping it"
                                );
                            }
                            mapped
                        })
                        .collect();
                    request.firing_trigger_id = remapped;

                    let result = self.client.create_tag(&workspace, request).await;
                    (source_id, name, result)
                }
            })
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        for (source_id, name, result) in results {
            match result {
                Ok(created) => {
                    let target_id = created.id().unwrap_or_default().to_string();
                    target.insert_tag(created);
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Created { target_id },
                    });
                }
                Err(error) => {
                    warn!(source_id = %source_id, name = %name, %error, "Tag copy failed");
                    outcomes.push(CopiedEntity {
                        source_id,
                        name,
                        outcome: CopyOutcome::Failed { error },
                    });
                }
            }
        }
        outcomes
    }
}
