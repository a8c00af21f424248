//! Integration tests for the JSON file client store and the
//! export/import commands built on top of it.

use pro_irp::cli::export::{ExportArgs, run_export};
use pro_irp::cli::import::{ImportReport, import_clients, read_clients};
use pro_irp::store::{ClientStore, JsonClientStore, StoreError};
use pro_irp::types::{ClientPatch, CommType, NewClient, NewComm, RiskLevel};
use std::sync::Arc;
use tempfile::TempDir;

fn new_client(name: &str) -> NewClient {
    NewClient {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn sms(text: &str) -> NewComm {
    NewComm {
        kind: Some(CommType::Sms),
        preview: Some(text.to_string()),
        ..Default::default()
    }
}

fn setup() -> (TempDir, JsonClientStore) {
    let temp = TempDir::new().expect("temp dir");
    let store = JsonClientStore::open(temp.path().join("data").join("clients.json"))
        .expect("open store");
    (temp, store)
}

#[tokio::test]
async fn data_survives_reopen() {
    let (_temp, store) = setup();
    let created = store.create_client("u1", new_client("Ruth")).await.unwrap();
    store.add_comm("u1", &created.id, sms("hello")).await.unwrap();

    let reopened = JsonClientStore::open(store.path()).unwrap();
    let fetched = reopened.get_client("u1", &created.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Ruth");
    assert_eq!(fetched.comms.len(), 1);
    assert_eq!(fetched.comms[0].kind, CommType::Sms);
}

#[tokio::test]
async fn file_is_a_plain_json_array() {
    let (_temp, store) = setup();
    store.create_client("u1", new_client("A")).await.unwrap();
    store.create_client("u2", new_client("B")).await.unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let array = value.as_array().expect("array on disk");
    assert_eq!(array.len(), 2);
    assert!(array[0].get("userId").is_some());
}

#[tokio::test]
async fn concurrent_writes_are_not_lost() {
    let (_temp, store) = setup();
    let store = Arc::new(store);
    let client = store.create_client("u1", new_client("Busy")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        let id = client.id.clone();
        handles.push(tokio::spawn(async move {
            store.add_comm("u1", &id, sms(&format!("m{}", i))).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let comms = store.list_comms("u1", &client.id).await.unwrap();
    assert_eq!(comms.len(), 20);
}

#[tokio::test]
async fn owner_scoping_and_not_found() {
    let (_temp, store) = setup();
    let created = store.create_client("u1", new_client("Mine")).await.unwrap();

    assert!(store.get_client("u2", &created.id).await.unwrap().is_none());
    assert!(store.list_clients("u2").await.unwrap().is_empty());
    assert!(matches!(
        store
            .update_client("u2", &created.id, ClientPatch::default())
            .await,
        Err(StoreError::ClientNotFound(_))
    ));

    let patch = ClientPatch {
        risk: Some(RiskLevel::Medium),
        ..Default::default()
    };
    let updated = store.update_client("u1", &created.id, patch).await.unwrap();
    assert_eq!(updated.risk, RiskLevel::Medium);

    store.delete_client("u1", &created.id).await.unwrap();
    assert!(store.list_clients("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn export_then_import_into_another_store() {
    let (temp, source) = setup();
    let a = source.create_client("u1", new_client("A")).await.unwrap();
    source.add_comm("u1", &a.id, sms("one")).await.unwrap();
    source.create_client("u2", new_client("B")).await.unwrap();

    let out = temp.path().join("backup.json.gz");
    let args = ExportArgs {
        output: Some(out.clone()),
        gzip: false,
    };
    assert_eq!(run_export(&source, &args).await.unwrap(), 2);
    assert_eq!(&std::fs::read(&out).unwrap()[..2], &[0x1f, 0x8b]);

    let target = JsonClientStore::open(temp.path().join("other.json")).unwrap();
    let clients = read_clients(&out).unwrap();

    let dry = import_clients(&target, clients.clone(), None, true)
        .await
        .unwrap();
    assert_eq!(dry.imported, 2);
    assert!(target.all_clients().await.unwrap().is_empty());

    let report = import_clients(&target, clients.clone(), None, false)
        .await
        .unwrap();
    assert_eq!(
        report,
        ImportReport {
            imported: 2,
            existing: 0,
            unowned: 0,
            failed: 0,
        }
    );
    let copied = target.get_client("u1", &a.id).await.unwrap().unwrap();
    assert_eq!(copied.comms.len(), 1);

    let again = import_clients(&target, clients, None, false).await.unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.existing, 2);
}

#[tokio::test]
async fn legacy_records_get_assigned_owner() {
    let temp = TempDir::new().unwrap();
    let legacy = temp.path().join("clients.json");
    std::fs::write(
        &legacy,
        r#"[{"id": "old-1", "name": "Legacy One"}, {"id": "old-2", "name": "Legacy Two"}]"#,
    )
    .unwrap();
    let clients = read_clients(&legacy).unwrap();

    let store = JsonClientStore::open(temp.path().join("store.json")).unwrap();
    let skipped = import_clients(&store, clients.clone(), None, false)
        .await
        .unwrap();
    assert_eq!(skipped.unowned, 2);
    assert_eq!(skipped.imported, 0);

    let report = import_clients(&store, clients, Some("agent-7"), false)
        .await
        .unwrap();
    assert_eq!(report.imported, 2);
    let owned = store.list_clients("agent-7").await.unwrap();
    assert_eq!(owned.len(), 2);
}

#[tokio::test]
async fn import_keeps_only_newest_comms_up_to_cap() {
    let temp = TempDir::new().unwrap();
    let legacy = temp.path().join("clients.json");
    let comms: Vec<_> = (1..=10)
        .map(|i| serde_json::json!({"id": format!("c{}", i), "type": "sms", "createdAt": i}))
        .collect();
    let body = serde_json::json!([{"id": "big-1", "userId": "u1", "name": "Chatty", "comms": comms}]);
    std::fs::write(&legacy, body.to_string()).unwrap();
    let clients = read_clients(&legacy).unwrap();

    let store = JsonClientStore::open(temp.path().join("store.json"))
        .unwrap()
        .with_max_comms(3);
    let report = import_clients(&store, clients, None, false).await.unwrap();
    assert_eq!(report.imported, 1);

    let kept = store.list_comms("u1", "big-1").await.unwrap();
    let ids: Vec<_> = kept.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c10", "c9", "c8"]);
}
