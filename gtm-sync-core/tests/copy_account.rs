use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gtm_sync_core::batch::BatchRunner;
use gtm_sync_core::config::AccountConfig;
use gtm_sync_core::contract::MockTagManagerClient;
use gtm_sync_core::copy::{CopyEngine, CopyOutcome};
use gtm_sync_core::error::RemoteError;
use gtm_sync_core::model::{
    Entity, Parameter, Tag, Trigger, Variable, Workspace, CONSTANT_VARIABLE_TYPE,
};
use gtm_sync_core::store::EntityStore;

fn runner() -> BatchRunner {
    BatchRunner::new(10, Duration::ZERO).unwrap()
}

fn target_account(overrides: BTreeMap<String, String>) -> AccountConfig {
    AccountConfig {
        alias: "target".into(),
        account_id: "2".into(),
        container_id: "20".into(),
        workspace_id: "3".into(),
        resettable: true,
        variable_overrides: overrides,
    }
}

fn source_store() -> EntityStore {
    EntityStore::new(Workspace::new("1", "10", "3"), false)
}

fn target_store() -> EntityStore {
    EntityStore::new(Workspace::new("2", "20", "3"), false)
}

fn variable(id: &str, name: &str, type_: &str, value: &str) -> Variable {
    Variable {
        account_id: Some("1".into()),
        container_id: Some("10".into()),
        workspace_id: Some("3".into()),
        variable_id: Some(id.into()),
        name: name.into(),
        type_: type_.into(),
        parameter: vec![Parameter {
            type_: "template".into(),
            key: Some("value".into()),
            value: Some(value.into()),
            list: Vec::new(),
        }],
        path: Some(format!("accounts/1/containers/10/workspaces/3/variables/{id}")),
        fingerprint: Some("1580297074".into()),
    }
}

fn trigger(id: &str, name: &str) -> Trigger {
    Trigger {
        trigger_id: Some(id.into()),
        name: name.into(),
        type_: "customEvent".into(),
        ..Default::default()
    }
}

fn tag(id: &str, name: &str, firing: &[&str]) -> Tag {
    Tag {
        tag_id: Some(id.into()),
        name: name.into(),
        type_: "html".into(),
        firing_trigger_id: firing.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Mocks a create call that assigns fresh identifiers starting at 901.
fn assign_trigger_ids(mock: &mut MockTagManagerClient) {
    let next = AtomicUsize::new(900);
    mock.expect_create_trigger().returning(move |_, mut t| {
        t.trigger_id = Some((next.fetch_add(1, Ordering::SeqCst) + 1).to_string());
        Ok(t)
    });
}

#[tokio::test]
async fn tags_fire_on_remapped_trigger_ids() {
    let mut source = source_store();
    source.insert_trigger(trigger("21", "page view"));
    source.insert_tag(tag("11", "analytics", &["21"]));

    let mut mock = MockTagManagerClient::new();
    assign_trigger_ids(&mut mock);
    mock.expect_create_tag()
        .withf(|_, tag| tag.firing_trigger_id == vec!["901".to_string()] && tag.id().is_none())
        .returning(|_, mut t| {
            t.tag_id = Some("800".into());
            Ok(t)
        });

    let account = target_account(BTreeMap::new());
    let engine = CopyEngine::new(&mock, runner(), &account);
    let mut target = target_store();
    let report = engine.copy_account(&source, &mut target).await;

    assert_eq!(report.failed_count(), 0);
    assert_eq!(
        report.triggers[0].outcome,
        CopyOutcome::Created {
            target_id: "901".into()
        }
    );
    // Stored under the identifiers the service assigned, not the source ones.
    assert!(target.triggers.contains_key("901"));
    assert!(!target.triggers.contains_key("21"));
    assert!(target.tags.contains_key("800"));
}

#[tokio::test]
async fn failed_trigger_reference_is_dropped_but_tag_is_created() {
    let mut source = source_store();
    source.insert_trigger(trigger("21", "broken"));
    source.insert_tag(tag("11", "analytics", &["21"]));

    let mut mock = MockTagManagerClient::new();
    mock.expect_create_trigger().returning(|_, _| {
        Err(RemoteError::Api {
            status: 400,
            message: "invalid filter".into(),
        })
    });
    mock.expect_create_tag()
        .withf(|_, tag| tag.firing_trigger_id.is_empty())
        .returning(|_, mut t| {
            t.tag_id = Some("800".into());
            Ok(t)
        });

    let account = target_account(BTreeMap::new());
    let engine = CopyEngine::new(&mock, runner(), &account);
    let mut target = target_store();
    let report = engine.copy_account(&source, &mut target).await;

    assert_eq!(report.failed_count(), 1);
    assert!(report.tags[0].succeeded());
    assert!(target.triggers.is_empty());
}

#[tokio::test]
async fn one_failing_variable_does_not_halt_later_entities() {
    let mut source = source_store();
    source.insert_variable(variable("31", "good", "c", "x"));
    source.insert_variable(variable("32", "bad", "c", "y"));
    source.insert_trigger(trigger("21", "page view"));
    source.insert_tag(tag("11", "analytics", &["21"]));

    let mut mock = MockTagManagerClient::new();
    let next = AtomicUsize::new(700);
    mock.expect_create_variable()
        .times(2)
        .returning(move |_, mut v| {
            if v.name == "bad" {
                return Err(RemoteError::Api {
                    status: 403,
                    message: "quota exceeded".into(),
                });
            }
            v.variable_id = Some((next.fetch_add(1, Ordering::SeqCst) + 1).to_string());
            Ok(v)
        });
    assign_trigger_ids(&mut mock);
    mock.expect_create_tag().times(1).returning(|_, mut t| {
        t.tag_id = Some("800".into());
        Ok(t)
    });

    let account = target_account(BTreeMap::new());
    let engine = CopyEngine::new(&mock, runner(), &account);
    let mut target = target_store();
    let report = engine.copy_account(&source, &mut target).await;

    // Every source entity appears in the report, failed or not.
    assert_eq!(report.variables.len(), 2);
    assert_eq!(report.triggers.len(), 1);
    assert_eq!(report.tags.len(), 1);
    let bad = report
        .variables
        .iter()
        .find(|v| v.name == "bad")
        .expect("failed variable must be reported");
    assert_eq!(
        bad.outcome,
        CopyOutcome::Failed {
            error: RemoteError::Api {
                status: 403,
                message: "quota exceeded".into()
            }
        }
    );
    assert_eq!(target.variables.len(), 1);
}

#[tokio::test]
async fn constant_override_replaces_the_value_parameter() {
    let mut source = source_store();
    source.insert_variable(variable("31", "api_host", CONSTANT_VARIABLE_TYPE, "prod.example.com"));
    source.insert_variable(variable("32", "api_host_script", "jsm", "prod.example.com"));

    let overrides = BTreeMap::from([("api_host".to_string(), "staging.example.com".to_string())]);

    let mut mock = MockTagManagerClient::new();
    let next = AtomicUsize::new(700);
    mock.expect_create_variable()
        .withf(|workspace, v| {
            // Scope retargeted, remote-assigned fields stripped.
            let value = v.parameter[0].value.as_deref();
            workspace.account_id == "2"
                && v.id().is_none()
                && v.path.is_none()
                && v.fingerprint.is_none()
                && v.account_id.as_deref() == Some("2")
                && if v.name == "api_host" {
                    value == Some("staging.example.com")
                } else {
                    // Overrides only apply to the constant type.
                    value == Some("prod.example.com")
                }
        })
        .times(2)
        .returning(move |_, mut v| {
            v.variable_id = Some((next.fetch_add(1, Ordering::SeqCst) + 1).to_string());
            Ok(v)
        });

    let account = target_account(overrides);
    let engine = CopyEngine::new(&mock, runner(), &account);
    let mut target = target_store();
    let report = engine.copy_account(&source, &mut target).await;
    assert_eq!(report.failed_count(), 0);
}
