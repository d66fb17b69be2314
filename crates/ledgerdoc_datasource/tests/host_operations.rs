use chrono::{DateTime, TimeZone, Utc};
use ledgerdoc_core::testing::ScriptedLedger;
use ledgerdoc_core::{ConfigError, DriverError, FixedClock, IonStruct, IonValue, RepoError};
use ledgerdoc_datasource::{DatasourceError, DriverRegistry, LedgerConfig, LedgerDatasource};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn config(value: JsonValue) -> LedgerConfig {
    serde_json::from_value(value).expect("config should parse")
}

fn people_config() -> LedgerConfig {
    config(json!({"region": "eu-west-1", "ledger": "crm", "table": "people"}))
}

fn datasource(ledger: &ScriptedLedger, config: &LedgerConfig) -> LedgerDatasource {
    let registry = DriverRegistry::new(Arc::new(ledger.clone()));
    LedgerDatasource::new(config, &registry)
        .expect("datasource should build")
        .with_clock(Arc::new(FixedClock(now())))
}

fn person(id: &str, name: &str) -> IonValue {
    IonValue::Struct(
        IonStruct::new()
            .with("documentId", id)
            .with("name", name)
            .with("createdAt", now())
            .with("updatedAt", now()),
    )
}

fn id_row(id: &str) -> IonValue {
    IonValue::Struct(IonStruct::new().with("documentId", id))
}

#[tokio::test]
async fn created_document_is_readable_by_generated_id() {
    let ledger = ScriptedLedger::new();
    ledger.respond(vec![id_row("doc-1")]);
    ledger.respond(vec![person("doc-1", "Ann")]);
    ledger.respond(vec![person("doc-1", "Ann")]);
    let datasource = datasource(&ledger, &people_config());

    let created = datasource
        .execute("create", json!({"json": {"name": "Ann"}}))
        .await
        .unwrap();
    let read = datasource
        .execute("readById", json!({"id": "doc-1"}))
        .await
        .unwrap();

    let expected = json!({
        "documentId": "doc-1",
        "name": "Ann",
        "createdAt": "2024-05-01T12:00:00.000Z",
        "updatedAt": "2024-05-01T12:00:00.000Z"
    });
    assert_eq!(created, expected);
    assert_eq!(read, expected);
    assert_eq!(ledger.committed(), 2);
    assert_eq!(
        ledger.statements()[2].text,
        r#"SELECT * FROM people BY documentId WHERE "documentId" = ?;"#
    );
}

#[tokio::test]
async fn read_by_id_without_match_returns_null() {
    let ledger = ScriptedLedger::new();
    let datasource = datasource(&ledger, &people_config());

    let read = datasource
        .execute("readById", json!({"id": "missing"}))
        .await
        .unwrap();

    assert_eq!(read, JsonValue::Null);
}

#[tokio::test]
async fn read_and_delete_return_arrays() {
    let ledger = ScriptedLedger::new();
    ledger.respond(vec![person("doc-1", "Ann"), person("doc-2", "Bo")]);
    ledger.respond(vec![id_row("doc-2")]);
    let datasource = datasource(&ledger, &people_config());

    let read = datasource
        .execute("read", json!({"json": {"status": "active"}}))
        .await
        .unwrap();
    let deleted = datasource
        .execute("deleteById", json!({"id": "doc-2"}))
        .await
        .unwrap();

    assert_eq!(read.as_array().map(Vec::len), Some(2));
    assert_eq!(deleted, json!([{"documentId": "doc-2"}]));
    assert_eq!(
        ledger.statements()[1].text,
        r#"DELETE FROM people BY documentId WHERE "documentId" = ?;"#
    );
}

#[tokio::test]
async fn update_binds_document_then_where() {
    let ledger = ScriptedLedger::new();
    ledger.respond(vec![id_row("doc-1")]);
    let datasource = datasource(&ledger, &people_config());

    let rows = datasource
        .execute(
            "update",
            json!({"document": {"name": "Ann B"}, "where": {"email": "ann@example.com"}}),
        )
        .await
        .unwrap();

    assert_eq!(rows, json!([{"documentId": "doc-1"}]));
    let statement = &ledger.statements()[0];
    assert_eq!(
        statement.text,
        r#"UPDATE people BY documentId SET "name" = ?, "updatedAt" = ? WHERE "email" = ?;"#
    );
    assert_eq!(
        statement.params,
        vec![
            IonValue::from("Ann B"),
            IonValue::from(now()),
            IonValue::from("ann@example.com"),
        ]
    );
}

#[tokio::test]
async fn insert_into_by_id_appends_json_document() {
    let ledger = ScriptedLedger::new();
    ledger.respond(vec![id_row("doc-1")]);
    ledger.respond(vec![IonValue::Struct(
        IonStruct::new()
            .with("documentId", "doc-1")
            .with("tags", vec![IonValue::from("vip")]),
    )]);
    let datasource = datasource(&ledger, &people_config());

    let row = datasource
        .execute(
            "insertIntoById",
            json!({"field": "tags", "document": "vip", "id": "doc-1"}),
        )
        .await
        .unwrap();

    assert_eq!(row, json!({"documentId": "doc-1", "tags": ["vip"]}));
    assert_eq!(
        ledger.statements()[0].params,
        vec![IonValue::from("doc-1"), IonValue::from("vip")]
    );
}

#[tokio::test]
async fn ambiguous_upsert_aborts_without_writing() {
    let ledger = ScriptedLedger::new();
    ledger.respond(vec![person("doc-1", "Ann"), person("doc-2", "Ann")]);
    let datasource = datasource(&ledger, &people_config());

    let err = datasource
        .execute(
            "upsert",
            json!({"document": {"age": 30}, "where": {"name": "Ann"}}),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DatasourceError::Repo(RepoError::AmbiguousUpsert { matches: 2, .. })
    ));
    assert_eq!(ledger.statements().len(), 1);
    assert_eq!(ledger.aborted(), 1);
    assert_eq!(ledger.committed(), 0);
}

#[tokio::test]
async fn payload_table_overrides_default_and_is_cached() {
    let ledger = ScriptedLedger::new();
    let datasource = datasource(&ledger, &people_config());

    datasource
        .execute("read", json!({"json": {}, "table": "accounts"}))
        .await
        .unwrap();
    datasource
        .execute("read", json!({"json": {}, "table": "accounts"}))
        .await
        .unwrap();
    datasource.execute("read", json!({})).await.unwrap();

    let statements = ledger.statements();
    assert_eq!(statements[0].text, "SELECT * FROM accounts BY documentId;");
    assert_eq!(statements[2].text, "SELECT * FROM people BY documentId;");
    assert_eq!(datasource.cached_repositories(), 2);
}

#[tokio::test]
async fn call_without_any_table_is_a_config_error() {
    let ledger = ScriptedLedger::new();
    let datasource = datasource(
        &ledger,
        &config(json!({"region": "eu-west-1", "ledger": "crm"})),
    );

    let err = datasource
        .execute("read", json!({"json": {}}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DatasourceError::Config(ConfigError::Missing("table"))
    ));
    assert!(ledger.statements().is_empty());
}

#[tokio::test]
async fn unknown_operation_and_bad_payload_are_rejected() {
    let ledger = ScriptedLedger::new();
    let datasource = datasource(&ledger, &people_config());

    let unknown = datasource
        .execute("truncate", json!({}))
        .await
        .unwrap_err();
    let payload = datasource
        .execute("readById", json!({"table": "people"}))
        .await
        .unwrap_err();

    assert!(matches!(unknown, DatasourceError::UnknownOperation(name) if name == "truncate"));
    assert!(matches!(payload, DatasourceError::Payload(_)));
    assert_eq!(ledger.begun(), 0);
}

#[test]
fn invalid_config_fails_at_construction() {
    let ledger = ScriptedLedger::new();
    let registry = DriverRegistry::new(Arc::new(ledger.clone()));

    let missing = LedgerDatasource::new(&LedgerConfig::default(), &registry)
        .err()
        .expect("missing region should fail");
    assert!(matches!(
        missing,
        DatasourceError::Config(ConfigError::Missing("region"))
    ));
    assert_eq!(ledger.built(), 0);

    ledger.fail_next_build(DriverError::Session("no credentials".to_string()));
    let build = LedgerDatasource::new(&people_config(), &registry)
        .err()
        .expect("factory failure should surface");
    assert!(matches!(build, DatasourceError::Driver(DriverError::Session(_))));
}
