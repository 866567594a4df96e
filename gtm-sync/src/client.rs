//! # Remote client (CLI <-> Core)
//!
//! Bridges the [`TagManagerClient`] contract to the real tag-management
//! HTTP API via reqwest. All transport, serialization and status-code
//! handling is encapsulated here; the engines only ever see
//! [`RemoteError`].
//!
//! ## Client Usage
//!
//! - Construct [`GtmClient`] from environment variables: `GTM_ACCESS_TOKEN`
//!   (an already-minted OAuth bearer token; the auth bootstrap is outside
//!   this tool) and optionally `GTM_API_BASE_URL`.
//! - Every call is scoped to a workspace path
//!   (`accounts/{a}/containers/{c}/workspaces/{w}`).

use async_trait::async_trait;
use serde::Deserialize;
use std::env;

use gtm_sync_core::contract::TagManagerClient;
use gtm_sync_core::error::RemoteError;
use gtm_sync_core::model::{Tag, Trigger, Variable, Workspace};

const DEFAULT_BASE_URL: &str = "https://tagmanager.googleapis.com/tagmanager/v2";

pub struct GtmClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GtmClient {
    pub fn new_from_env() -> anyhow::Result<Self> {
        let token = env::var("GTM_ACCESS_TOKEN").map_err(|e| {
            tracing::error!(error = ?e, "GTM_ACCESS_TOKEN missing in environment");
            anyhow::anyhow!("GTM_ACCESS_TOKEN must be set to an OAuth access token")
        })?;
        let base_url =
            env::var("GTM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        tracing::info!(base_url = %base_url, "Initialized tag manager client from environment");
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    fn url(&self, workspace: &Workspace, suffix: &str) -> String {
        format!("{}/{}/{}", self.base_url, workspace.parent(), suffix)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, RemoteError> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        response.json().await.map_err(transport)
    }

    async fn post_json<B: serde::Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &B,
    ) -> Result<T, RemoteError> {
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;
        response.json().await.map_err(transport)
    }

    async fn delete(&self, url: String) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        check_status(response).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("unreadable error body: {e}"));
    Err(RemoteError::Api { status, message })
}

// List responses wrap the entities in a singular-named field and omit it
// entirely for an empty workspace.
#[derive(Deserialize)]
struct VariableList {
    #[serde(default)]
    variable: Vec<Variable>,
}

#[derive(Deserialize)]
struct TriggerList {
    #[serde(default)]
    trigger: Vec<Trigger>,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tag: Vec<Tag>,
}

#[async_trait]
impl TagManagerClient for GtmClient {
    async fn list_variables(
        &self,
        workspace: &Workspace,
    ) -> Result<Vec<Variable>, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), "Listing variables");
        let list: VariableList = self.get_json(self.url(workspace, "variables")).await?;
        Ok(list.variable)
    }

    async fn list_triggers(&self, workspace: &Workspace) -> Result<Vec<Trigger>, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), "Listing triggers");
        let list: TriggerList = self.get_json(self.url(workspace, "triggers")).await?;
        Ok(list.trigger)
    }

    async fn list_tags(&self, workspace: &Workspace) -> Result<Vec<Tag>, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), "Listing tags");
        let list: TagList = self.get_json(self.url(workspace, "tags")).await?;
        Ok(list.tag)
    }

    async fn create_variable(
        &self,
        workspace: &Workspace,
        variable: Variable,
    ) -> Result<Variable, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), name = %variable.name, "Creating variable");
        self.post_json(self.url(workspace, "variables"), &variable)
            .await
    }

    async fn create_trigger(
        &self,
        workspace: &Workspace,
        trigger: Trigger,
    ) -> Result<Trigger, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), name = %trigger.name, "Creating trigger");
        self.post_json(self.url(workspace, "triggers"), &trigger)
            .await
    }

    async fn create_tag(&self, workspace: &Workspace, tag: Tag) -> Result<Tag, RemoteError> {
        tracing::info!(workspace = %workspace.parent(), name = %tag.name, "Creating tag");
        self.post_json(self.url(workspace, "tags"), &tag).await
    }

    async fn delete_variable(
        &self,
        workspace: &Workspace,
        variable_id: &str,
    ) -> Result<(), RemoteError> {
        tracing::info!(workspace = %workspace.parent(), variable_id, "Deleting variable");
        self.delete(self.url(workspace, &format!("variables/{variable_id}")))
            .await
    }

    async fn delete_trigger(
        &self,
        workspace: &Workspace,
        trigger_id: &str,
    ) -> Result<(), RemoteError> {
        tracing::info!(workspace = %workspace.parent(), trigger_id, "Deleting trigger");
        self.delete(self.url(workspace, &format!("triggers/{trigger_id}")))
            .await
    }

    async fn delete_tag(&self, workspace: &Workspace, tag_id: &str) -> Result<(), RemoteError> {
        tracing::info!(workspace = %workspace.parent(), tag_id, "Deleting tag");
        self.delete(self.url(workspace, &format!("tags/{tag_id}")))
            .await
    }
}
