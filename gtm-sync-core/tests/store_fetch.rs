use gtm_sync_core::contract::MockTagManagerClient;
use gtm_sync_core::model::{Tag, Trigger, Variable, Workspace};
use gtm_sync_core::store::EntityStore;

fn listing_mock() -> MockTagManagerClient {
    let mut mock = MockTagManagerClient::new();
    mock.expect_list_triggers().returning(|_| {
        Ok(vec![Trigger {
            trigger_id: Some("21".into()),
            name: "page view".into(),
            type_: "customEvent".into(),
            ..Default::default()
        }])
    });
    mock.expect_list_variables().returning(|_| {
        Ok(vec![
            Variable {
                variable_id: Some("31".into()),
                name: "env".into(),
                type_: "c".into(),
                ..Default::default()
            },
            Variable {
                variable_id: Some("32".into()),
                name: "page title".into(),
                type_: "jsm".into(),
                ..Default::default()
            },
        ])
    });
    mock.expect_list_tags().returning(|_| {
        Ok(vec![Tag {
            tag_id: Some("11".into()),
            name: "analytics".into(),
            type_: "html".into(),
            firing_trigger_id: vec!["21".into()],
            ..Default::default()
        }])
    });
    mock
}

#[tokio::test]
async fn fetch_populates_all_three_kinds_keyed_by_id() {
    let mock = listing_mock();
    let mut store = EntityStore::new(Workspace::new("1", "10", "3"), false);
    store.fetch(&mock).await.unwrap();

    assert_eq!(store.variables.len(), 2);
    assert_eq!(store.triggers["21"].name, "page view");
    assert_eq!(store.tags["11"].firing_trigger_id, vec!["21".to_string()]);
}

#[tokio::test]
async fn fetching_twice_without_mutation_is_idempotent() {
    let mock = listing_mock();
    let mut store = EntityStore::new(Workspace::new("1", "10", "3"), false);
    store.fetch(&mock).await.unwrap();
    let first = store.clone();
    store.fetch(&mock).await.unwrap();

    assert_eq!(
        first.variables.keys().collect::<Vec<_>>(),
        store.variables.keys().collect::<Vec<_>>()
    );
    assert_eq!(first.variables, store.variables);
    assert_eq!(first.triggers, store.triggers);
    assert_eq!(first.tags, store.tags);
}
