//! Ordered deletion of everything in a target account.
//!
//! Deletion runs in four batched stages: all tags, then all triggers, then
//! script-derived variables, then the remaining variables. Tags reference
//! triggers, so they must go first or the service rejects the trigger
//! deletes with dangling-reference errors. The variable split (script-type
//! first) mirrors the service's reference rules between variable kinds; the
//! order is load-bearing and must not be rearranged.
//!
//! The `resettable` gate is checked before the first remote call; a
//! non-resettable account fails fast with zero deletions performed. Within
//! a stage every failure is captured per entity and never blocks siblings.

use tracing::{info, warn};

use crate::batch::BatchRunner;
use crate::contract::TagManagerClient;
use crate::error::{RemoteError, SyncError};
use crate::model::{Entity, EntityKind, Variable, SCRIPT_VARIABLE_TYPE};
use crate::store::EntityStore;

/// Outcome of one attempted entity deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed { error: RemoteError },
}

#[derive(Debug, Clone)]
pub struct DeletedEntity {
    pub id: String,
    pub name: String,
    pub outcome: DeleteOutcome,
}

impl DeletedEntity {
    pub fn succeeded(&self) -> bool {
        self.outcome == DeleteOutcome::Deleted
    }
}

/// Per-entity outcome record for one reset, partitioned by kind. Variables
/// appear in deletion order: script-derived ones first.
#[derive(Debug, Clone, Default)]
pub struct DeleteReport {
    pub tags: Vec<DeletedEntity>,
    pub triggers: Vec<DeletedEntity>,
    pub variables: Vec<DeletedEntity>,
}

impl DeleteReport {
    pub fn failed_count(&self) -> usize {
        self.tags
            .iter()
            .chain(&self.triggers)
            .chain(&self.variables)
            .filter(|entity| !entity.succeeded())
            .count()
    }
}

pub struct ResetEngine<'a, C> {
    client: &'a C,
    runner: BatchRunner,
}

impl<'a, C: TagManagerClient> ResetEngine<'a, C> {
    pub fn new(client: &'a C, runner: BatchRunner) -> Self {
        Self { client, runner }
    }

    /// Deletes every entity in the target account.
    ///
    /// Fails with [`SyncError::NotResettable`] before any remote call when
    /// the account is not marked resettable. Successfully deleted entities
    /// are removed from the store.
    pub async fn reset(&self, target: &mut EntityStore) -> Result<DeleteReport, SyncError> {
        if !target.resettable() {
            return Err(SyncError::NotResettable {
                account_id: target.workspace().account_id.clone(),
            });
        }
        info!(target = %target.workspace().parent(), "Resetting account");

        let tags = self
            .delete_stage(target, EntityKind::Tag, |store| {
                store
                    .tags
                    .values()
                    .map(|tag| (tag.id().unwrap_or_default().to_string(), tag.name.clone()))
                    .collect()
            })
            .await;
        for deleted in tags.iter().filter(|d| d.succeeded()) {
            target.remove_tag(&deleted.id);
        }

        let triggers = self
            .delete_stage(target, EntityKind::Trigger, |store| {
                store
                    .triggers
                    .values()
                    .map(|t| (t.id().unwrap_or_default().to_string(), t.name.clone()))
                    .collect()
            })
            .await;
        for deleted in triggers.iter().filter(|d| d.succeeded()) {
            target.remove_trigger(&deleted.id);
        }

        // Script-derived variables go before the rest.
        let mut variables = self
            .delete_stage(target, EntityKind::Variable, |store| {
                variable_items(store, |v| v.type_ == SCRIPT_VARIABLE_TYPE)
            })
            .await;
        variables.extend(
            self.delete_stage(target, EntityKind::Variable, |store| {
                variable_items(store, |v| v.type_ != SCRIPT_VARIABLE_TYPE)
            })
            .await,
        );
        for deleted in variables.iter().filter(|d| d.succeeded()) {
            target.remove_variable(&deleted.id);
        }

        let report = DeleteReport {
            tags,
            triggers,
            variables,
        };
        info!(failed = report.failed_count(), "Reset finished");
        Ok(report)
    }

    async fn delete_stage(
        &self,
        target: &EntityStore,
        kind: EntityKind,
        collect: impl Fn(&EntityStore) -> Vec<(String, String)>,
    ) -> Vec<DeletedEntity> {
        let items = collect(target);
        let workspace = target.workspace().clone();
        info!(count = items.len(), %kind, "Deleting entities");

        self.runner
            .run(items, |(id, name)| {
                let workspace = workspace.clone();
                async move {
                    let result = match kind {
                        EntityKind::Tag => self.client.delete_tag(&workspace, &id).await,
                        EntityKind::Trigger => self.client.delete_trigger(&workspace, &id).await,
                        EntityKind::Variable => {
                            self.client.delete_variable(&workspace, &id).await
                        }
                    };
                    into_outcome(kind, id, name, result)
                }
            })
            .await
    }
}

fn variable_items(
    store: &EntityStore,
    include: impl Fn(&Variable) -> bool,
) -> Vec<(String, String)> {
    store
        .variables
        .values()
        .filter(|variable| include(variable))
        .map(|v| (v.id().unwrap_or_default().to_string(), v.name.clone()))
        .collect()
}

fn into_outcome(
    kind: EntityKind,
    id: String,
    name: String,
    result: Result<(), RemoteError>,
) -> DeletedEntity {
    match result {
        Ok(()) => DeletedEntity {
            id,
            name,
            outcome: DeleteOutcome::Deleted,
        },
        Err(error) => {
            warn!(%kind, id = %id, name = %name, %error, "Delete failed");
            DeletedEntity {
                id,
                name,
                outcome: DeleteOutcome::Failed { error },
            }
        }
    }
}
