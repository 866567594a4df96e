//! In-memory, per-account entity store.
//!
//! One [`EntityStore`] holds everything known about a single account's
//! workspace: one map per entity kind, keyed by the remote-assigned
//! identifier. Stores are created per command invocation, populated once by
//! [`EntityStore::fetch`], mutated by the copy/reset engines as creates and
//! deletes succeed, and discarded at process exit.
//!
//! Invariant: a map key is always the entity's own current identifier. In
//! particular, after a create the entity is stored under the identifier the
//! remote service returned, never the one the caller had on the source side.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::contract::TagManagerClient;
use crate::error::RemoteError;
use crate::model::{Entity, Tag, Trigger, Variable, Workspace};

#[derive(Debug, Clone)]
pub struct EntityStore {
    workspace: Workspace,
    resettable: bool,
    pub variables: BTreeMap<String, Variable>,
    pub triggers: BTreeMap<String, Trigger>,
    pub tags: BTreeMap<String, Tag>,
}

impl EntityStore {
    pub fn new(workspace: Workspace, resettable: bool) -> Self {
        Self {
            workspace,
            resettable,
            variables: BTreeMap::new(),
            triggers: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Whether destructive operations may touch this account.
    pub fn resettable(&self) -> bool {
        self.resettable
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.triggers.is_empty() && self.tags.is_empty()
    }

    /// Populates all three maps with a full list-fetch from the remote
    /// service. Replaces any previously fetched state, so calling it twice
    /// without intervening mutation yields the same store.
    pub async fn fetch<C: TagManagerClient>(&mut self, client: &C) -> Result<(), RemoteError> {
        let triggers = client.list_triggers(&self.workspace).await?;
        self.triggers.clear();
        for trigger in triggers {
            insert_keyed(&mut self.triggers, trigger);
        }

        let variables = client.list_variables(&self.workspace).await?;
        self.variables.clear();
        for variable in variables {
            insert_keyed(&mut self.variables, variable);
        }

        let tags = client.list_tags(&self.workspace).await?;
        self.tags.clear();
        for tag in tags {
            insert_keyed(&mut self.tags, tag);
        }

        info!(
            workspace = %self.workspace.parent(),
            variables = self.variables.len(),
            triggers = self.triggers.len(),
            tags = self.tags.len(),
            "Fetched account entities"
        );
        Ok(())
    }

    /// Stores a freshly created variable under its remote-assigned id.
    pub fn insert_variable(&mut self, variable: Variable) {
        insert_keyed(&mut self.variables, variable);
    }

    pub fn insert_trigger(&mut self, trigger: Trigger) {
        insert_keyed(&mut self.triggers, trigger);
    }

    pub fn insert_tag(&mut self, tag: Tag) {
        insert_keyed(&mut self.tags, tag);
    }

    pub fn remove_variable(&mut self, variable_id: &str) {
        self.variables.remove(variable_id);
    }

    pub fn remove_trigger(&mut self, trigger_id: &str) {
        self.triggers.remove(trigger_id);
    }

    pub fn remove_tag(&mut self, tag_id: &str) {
        self.tags.remove(tag_id);
    }
}

fn insert_keyed<T: Entity>(map: &mut BTreeMap<String, T>, entity: T) {
    match entity.id() {
        Some(id) => {
            map.insert(id.to_string(), entity);
        }
        None => {
            warn!(
                kind = %T::KIND,
                name = entity.name(),
                "Entity without an identifier, not storing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_are_keyed_by_their_own_id() {
        let mut store = EntityStore::new(Workspace::new("1", "2", "3"), false);
        store.insert_trigger(Trigger {
            trigger_id: Some("42".into()),
            name: "page view".into(),
            ..Default::default()
        });
        assert_eq!(store.triggers["42"].name, "page view");
    }

    #[test]
    fn entities_without_id_are_dropped() {
        let mut store = EntityStore::new(Workspace::new("1", "2", "3"), false);
        store.insert_variable(Variable {
            name: "orphan".into(),
            ..Default::default()
        });
        assert!(store.is_empty());
    }
}
