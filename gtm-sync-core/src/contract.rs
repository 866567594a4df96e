//! # contract: capability interface for the remote tag-management service
//!
//! This module defines a single trait ([`TagManagerClient`]) covering every
//! remote operation the engines perform: listing, creating and deleting
//! variables, triggers and tags, all scoped to a [`Workspace`] path.
//!
//! ## Interface & Extensibility
//! - Implement the trait to plug in a real API client, a recording fake, or
//!   a mock.
//! - All methods are async and return [`RemoteError`] on rejection; the
//!   engines decide whether a failure is fatal or recorded per entity.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.
//!
//! The production implementation lives in the CLI crate, next to the
//! transport and auth details it needs.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::RemoteError;
use crate::model::{Tag, Trigger, Variable, Workspace};

/// Capability operations against the remote tag-management service.
///
/// Create calls take the entity without remote-assigned fields and return
/// the created entity carrying the identifier the service assigned; callers
/// must key follow-up work on the *returned* identifier, never the one they
/// sent (none is sent on create).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TagManagerClient: Send + Sync {
    async fn list_variables(&self, workspace: &Workspace)
        -> Result<Vec<Variable>, RemoteError>;

    async fn list_triggers(&self, workspace: &Workspace) -> Result<Vec<Trigger>, RemoteError>;

    async fn list_tags(&self, workspace: &Workspace) -> Result<Vec<Tag>, RemoteError>;

    async fn create_variable(
        &self,
        workspace: &Workspace,
        variable: Variable,
    ) -> Result<Variable, RemoteError>;

    async fn create_trigger(
        &self,
        workspace: &Workspace,
        trigger: Trigger,
    ) -> Result<Trigger, RemoteError>;

    async fn create_tag(&self, workspace: &Workspace, tag: Tag) -> Result<Tag, RemoteError>;

    async fn delete_variable(
        &self,
        workspace: &Workspace,
        variable_id: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_trigger(
        &self,
        workspace: &Workspace,
        trigger_id: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_tag(&self, workspace: &Workspace, tag_id: &str) -> Result<(), RemoteError>;
}
