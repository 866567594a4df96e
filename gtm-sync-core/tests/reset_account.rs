use std::sync::{Arc, Mutex};
use std::time::Duration;

use gtm_sync_core::batch::BatchRunner;
use gtm_sync_core::contract::MockTagManagerClient;
use gtm_sync_core::error::{RemoteError, SyncError};
use gtm_sync_core::model::{Tag, Trigger, Variable, Workspace, SCRIPT_VARIABLE_TYPE};
use gtm_sync_core::reset::ResetEngine;
use gtm_sync_core::store::EntityStore;

fn runner() -> BatchRunner {
    BatchRunner::new(10, Duration::ZERO).unwrap()
}

fn populated_store(resettable: bool) -> EntityStore {
    let mut store = EntityStore::new(Workspace::new("2", "20", "3"), resettable);
    store.insert_tag(Tag {
        tag_id: Some("11".into()),
        name: "analytics".into(),
        ..Default::default()
    });
    store.insert_trigger(Trigger {
        trigger_id: Some("21".into()),
        name: "page view".into(),
        ..Default::default()
    });
    store.insert_variable(Variable {
        variable_id: Some("31".into()),
        name: "plain".into(),
        type_: "c".into(),
        ..Default::default()
    });
    store.insert_variable(Variable {
        variable_id: Some("32".into()),
        name: "script".into(),
        type_: SCRIPT_VARIABLE_TYPE.into(),
        ..Default::default()
    });
    store
}

/// Wires all three delete methods to append `kind:id` to a shared log.
fn recording_mock(calls: Arc<Mutex<Vec<String>>>) -> MockTagManagerClient {
    let mut mock = MockTagManagerClient::new();
    let log = calls.clone();
    mock.expect_delete_tag().returning(move |_, id| {
        log.lock().unwrap().push(format!("tag:{id}"));
        Ok(())
    });
    let log = calls.clone();
    mock.expect_delete_trigger().returning(move |_, id| {
        log.lock().unwrap().push(format!("trigger:{id}"));
        Ok(())
    });
    let log = calls;
    mock.expect_delete_variable().returning(move |_, id| {
        log.lock().unwrap().push(format!("variable:{id}"));
        Ok(())
    });
    mock
}

#[tokio::test]
async fn deletes_in_dependency_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mock = recording_mock(calls.clone());
    let mut store = populated_store(true);

    let report = ResetEngine::new(&mock, runner())
        .reset(&mut store)
        .await
        .unwrap();

    // Tags, then triggers, then the script-derived variable, then the rest.
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "tag:11".to_string(),
            "trigger:21".to_string(),
            "variable:32".to_string(),
            "variable:31".to_string(),
        ]
    );
    assert_eq!(report.failed_count(), 0);
    assert_eq!(report.variables[0].id, "32");
    assert!(store.is_empty());
}

#[tokio::test]
async fn non_resettable_account_performs_zero_remote_calls() {
    // No expectations set: any remote call would panic the mock.
    let mock = MockTagManagerClient::new();
    let mut store = populated_store(false);

    let err = ResetEngine::new(&mock, runner())
        .reset(&mut store)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SyncError::NotResettable {
            account_id: "2".into()
        }
    );
    assert_eq!(store.tags.len(), 1);
}

#[tokio::test]
async fn failed_delete_is_recorded_and_kept_in_the_store() {
    let mut mock = MockTagManagerClient::new();
    mock.expect_delete_tag().returning(|_, _| {
        Err(RemoteError::Api {
            status: 409,
            message: "referenced by a paused tag".into(),
        })
    });
    mock.expect_delete_trigger().returning(|_, _| Ok(()));
    mock.expect_delete_variable().returning(|_, _| Ok(()));

    let mut store = populated_store(true);
    let report = ResetEngine::new(&mock, runner())
        .reset(&mut store)
        .await
        .unwrap();

    assert_eq!(report.failed_count(), 1);
    assert!(!report.tags[0].succeeded());
    // Later stages still ran to completion.
    assert_eq!(report.triggers.len(), 1);
    assert_eq!(report.variables.len(), 2);
    // The tag that failed to delete stays in the store.
    assert_eq!(store.tags.len(), 1);
    assert!(store.triggers.is_empty());
    assert!(store.variables.is_empty());
}
