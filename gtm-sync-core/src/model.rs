//! Entity model for the tag-management service.
//!
//! Variables, triggers and tags are plain serde structs whose JSON field
//! names follow the remote API (`variableId`, `firingTriggerId`, ...).
//! Identifiers, `path` and `fingerprint` are assigned by the remote service
//! and are absent until a create call succeeds; they must never be sent on
//! create, which is why [`Entity::strip_remote_fields`] clears them.

use serde::{Deserialize, Serialize};

/// Variable type for a constant value. Only constants are subject to
/// per-account value overrides during copy.
pub const CONSTANT_VARIABLE_TYPE: &str = "c";

/// Variable type for a custom-JavaScript (script-derived) value. These are
/// deleted ahead of all other variables during reset.
pub const SCRIPT_VARIABLE_TYPE: &str = "jsm";

/// The three-level scope path every remote operation is relative to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub account_id: String,
    pub container_id: String,
    pub workspace_id: String,
}

impl Workspace {
    pub fn new(
        account_id: impl Into<String>,
        container_id: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            container_id: container_id.into(),
            workspace_id: workspace_id.into(),
        }
    }

    /// Parent path used by list/create calls.
    pub fn parent(&self) -> String {
        format!(
            "accounts/{}/containers/{}/workspaces/{}",
            self.account_id, self.container_id, self.workspace_id
        )
    }
}

/// One ordered key/value configuration entry. Opaque to the engines beyond
/// structural comparison; `list` nests further parameters for structured
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<Parameter>,
}

/// One clause of a trigger's custom event filter. Opaque structured
/// expression; compared structurally by the diff engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Variable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_id: Option<String>,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trigger {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_event_filter: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    /// Ordered trigger identifiers this tag fires on. The one cross-entity
    /// reference in the model; identifiers are account-local, so the copy
    /// engine rewrites this list through its remap table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub firing_trigger_id: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameter: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Variable,
    Trigger,
    Tag,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Variable => write!(f, "Variable"),
            EntityKind::Trigger => write!(f, "Trigger"),
            EntityKind::Tag => write!(f, "Tag"),
        }
    }
}

/// Common surface the store and engines need from all three entity kinds.
pub trait Entity: Clone + Send + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Option<&str>;
    fn name(&self) -> &str;
    fn type_(&self) -> &str;

    /// Clears the remote-assigned fields (identifier, path, fingerprint)
    /// that must not be present on a create request.
    fn strip_remote_fields(&mut self);

    /// Rewrites the scope ids to the given workspace.
    fn retarget(&mut self, workspace: &Workspace);
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr, $id_field:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> Option<&str> {
                self.$id_field.as_deref()
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn type_(&self) -> &str {
                &self.type_
            }

            fn strip_remote_fields(&mut self) {
                self.$id_field = None;
                self.path = None;
                self.fingerprint = None;
            }

            fn retarget(&mut self, workspace: &Workspace) {
                self.account_id = Some(workspace.account_id.clone());
                self.container_id = Some(workspace.container_id.clone());
                self.workspace_id = Some(workspace.workspace_id.clone());
            }
        }
    };
}

impl_entity!(Variable, EntityKind::Variable, variable_id);
impl_entity!(Trigger, EntityKind::Trigger, trigger_id);
impl_entity!(Tag, EntityKind::Tag, tag_id);

impl Variable {
    /// Sets the `value` parameter, inserting it if the variable has none.
    /// Used for per-account constant overrides during copy.
    pub fn set_value_parameter(&mut self, value: &str) {
        match self
            .parameter
            .iter_mut()
            .find(|p| p.key.as_deref() == Some("value"))
        {
            Some(param) => param.value = Some(value.to_string()),
            None => self.parameter.push(Parameter {
                type_: "template".to_string(),
                key: Some("value".to_string()),
                value: Some(value.to_string()),
                list: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_parent_path() {
        let ws = Workspace::new("123", "456", "7");
        assert_eq!(ws.parent(), "accounts/123/containers/456/workspaces/7");
    }

    #[test]
    fn strip_remote_fields_clears_assigned_ids() {
        let mut tag = Tag {
            tag_id: Some("11".into()),
            path: Some("accounts/1/containers/2/workspaces/3/tags/11".into()),
            fingerprint: Some("158029707".into()),
            name: "GA4 page view".into(),
            ..Default::default()
        };
        tag.strip_remote_fields();
        assert_eq!(tag.id(), None);
        assert_eq!(tag.path, None);
        assert_eq!(tag.fingerprint, None);
        assert_eq!(tag.name, "GA4 page view");
    }

    #[test]
    fn retarget_rewrites_scope_ids() {
        let mut variable = Variable {
            account_id: Some("1".into()),
            container_id: Some("2".into()),
            workspace_id: Some("3".into()),
            name: "env".into(),
            ..Default::default()
        };
        variable.retarget(&Workspace::new("9", "8", "7"));
        assert_eq!(variable.account_id.as_deref(), Some("9"));
        assert_eq!(variable.container_id.as_deref(), Some("8"));
        assert_eq!(variable.workspace_id.as_deref(), Some("7"));
    }

    #[test]
    fn set_value_parameter_replaces_existing_value() {
        let mut variable = Variable {
            name: "api_host".into(),
            type_: CONSTANT_VARIABLE_TYPE.into(),
            parameter: vec![Parameter {
                type_: "template".into(),
                key: Some("value".into()),
                value: Some("prod.example.com".into()),
                list: Vec::new(),
            }],
            ..Default::default()
        };
        variable.set_value_parameter("staging.example.com");
        assert_eq!(variable.parameter.len(), 1);
        assert_eq!(
            variable.parameter[0].value.as_deref(),
            Some("staging.example.com")
        );
    }

    #[test]
    fn set_value_parameter_inserts_when_missing() {
        let mut variable = Variable::default();
        variable.set_value_parameter("on");
        assert_eq!(variable.parameter[0].key.as_deref(), Some("value"));
        assert_eq!(variable.parameter[0].value.as_deref(), Some("on"));
    }

    #[test]
    fn entity_json_uses_remote_field_names() {
        let tag = Tag {
            tag_id: Some("5".into()),
            name: "pixel".into(),
            type_: "html".into(),
            firing_trigger_id: vec!["21".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["tagId"], "5");
        assert_eq!(json["firingTriggerId"][0], "21");
        assert_eq!(json["type"], "html");
    }
}
