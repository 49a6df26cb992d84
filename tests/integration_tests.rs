//! Adapter Integration Tests
//!
//! End-to-end checks of the adapter contract against the in-memory client:
//! - Connect-time project/location resolution
//! - Credential discovery and verification at connect
//! - The two-query catalog contract and its SQL
//! - Catalog grouping, independent of row order
//! - Permission failures on metadata queries
//! - Query execution through the row cursor

use bigquery_adapter::client::mock::MockClient;
use bigquery_adapter::client::{FieldInfo, PageCursor, ResultPage, WarehouseError};
use bigquery_adapter::config::GCLOUD_ADC_FILE;
use bigquery_adapter::{
    Adapter, AdapterConfig, AdapterError, AmbientEnvironment, BigQueryAdapter, Connection,
    CredentialSource, MetadataView,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ============================================================================
// Test Helpers
// ============================================================================

fn relation(dataset: &str, name: &str, kind: &str, object: &str) -> Vec<Value> {
    vec![json!(dataset), json!(name), json!(kind), json!(object)]
}

fn column(dataset: &str, table: &str, name: &str, data_type: &str, pos: u32) -> Vec<Value> {
    vec![json!(dataset), json!(table), json!(name), json!(data_type), json!(pos.to_string())]
}

fn relations_page(rows: Vec<Vec<Value>>) -> ResultPage {
    ResultPage::with_rows(
        vec![
            FieldInfo::new("dataset", "STRING"),
            FieldInfo::new("name", "STRING"),
            FieldInfo::new("kind", "STRING"),
            FieldInfo::new("object", "STRING"),
        ],
        rows,
    )
}

fn columns_page(rows: Vec<Vec<Value>>) -> ResultPage {
    ResultPage::with_rows(
        vec![
            FieldInfo::new("dataset", "STRING"),
            FieldInfo::new("table", "STRING"),
            FieldInfo::new("name", "STRING"),
            FieldInfo::new("data_type", "STRING"),
            FieldInfo::new("ordinal_position", "INTEGER"),
        ],
        rows,
    )
}

fn connect(project: Option<&str>, location: Option<&str>, client: MockClient) -> Connection<MockClient> {
    let config = AdapterConfig::new(project.map(str::to_string), location.map(str::to_string));
    BigQueryAdapter::new(config)
        .with_ambient(AmbientEnvironment::empty())
        .connect_with(client)
        .expect("connect should succeed")
}

fn acme_client() -> MockClient {
    MockClient::new()
        .on_query(
            "INFORMATION_SCHEMA.TABLES",
            Ok(relations_page(vec![relation("analytics", "events", "BASE TABLE", "TABLE")])),
        )
        .on_query(
            "INFORMATION_SCHEMA.COLUMNS",
            Ok(columns_page(vec![
                column("analytics", "events", "ts", "TIMESTAMP", 2),
                column("analytics", "events", "id", "INT64", 1),
            ])),
        )
}

// ============================================================================
// Connect
// ============================================================================

#[test]
fn test_connect_without_any_project_fails_with_configuration_error() {
    let result = BigQueryAdapter::new(AdapterConfig::default())
        .with_ambient(AmbientEnvironment::empty())
        .connect_with(MockClient::new());
    assert!(matches!(result, Err(AdapterError::ConfigurationError(_))));
}

#[test]
fn test_connect_invalid_project_fails_before_any_query() {
    let result = BigQueryAdapter::new(AdapterConfig::new(Some("x".into()), None))
        .with_ambient(AmbientEnvironment::empty())
        .connect_with(MockClient::new());
    assert!(matches!(result, Err(AdapterError::ConfigurationError(_))));
}

#[test]
fn test_connect_falls_back_to_gcloud_project() {
    let dir = std::env::temp_dir().join("bq_adapter_integration_gcloud");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("configurations")).unwrap();
    std::fs::write(dir.join("configurations").join("config_default"), "[core]\nproject = gcloud-co\n")
        .unwrap();

    let ambient = AmbientEnvironment { gcloud_config_dir: Some(dir.clone()), ..Default::default() };
    let conn = BigQueryAdapter::new(AdapterConfig::default())
        .with_ambient(ambient)
        .connect_with(MockClient::new())
        .unwrap();
    assert_eq!(conn.settings().project, "gcloud-co");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_connect_with_no_ambient_credentials_is_authentication_error() {
    let ambient = AmbientEnvironment { project_env: Some("acme-co".into()), ..Default::default() };
    let result = BigQueryAdapter::new(AdapterConfig::default()).with_ambient(ambient).connect().await;

    let err = result.err().expect("connect should fail");
    assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
}

#[tokio::test]
async fn test_connect_with_neither_project_nor_credentials_is_configuration_error() {
    let result = BigQueryAdapter::new(AdapterConfig::default())
        .with_ambient(AmbientEnvironment::empty())
        .connect()
        .await;

    let err = result.err().expect("connect should fail");
    assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_expired_credentials_fail_at_connect_not_on_first_query() {
    let client = MockClient::new()
        .with_credential_failure(WarehouseError::unauthenticated("invalid_grant: Token has been expired or revoked."))
        .on_query("select", Ok(ResultPage::empty()));

    let result = BigQueryAdapter::new(AdapterConfig::new(Some("acme-co".into()), None))
        .with_ambient(AmbientEnvironment::empty())
        .connect_verified(client)
        .await;

    match result {
        Err(AdapterError::AuthenticationError(message)) => assert!(message.contains("invalid_grant")),
        Err(other) => panic!("expected AuthenticationError, got {other:?}"),
        Ok(_) => panic!("expected AuthenticationError, got a connection"),
    }
}

#[tokio::test]
async fn test_verified_connect_issues_no_jobs() {
    let conn = BigQueryAdapter::new(AdapterConfig::new(Some("acme-co".into()), Some("EU".into())))
        .with_ambient(AmbientEnvironment::empty())
        .connect_verified(acme_client())
        .await
        .unwrap();

    assert_eq!(conn.client().credential_checks(), 1);
    assert!(conn.client().jobs().is_empty());

    conn.load_catalog().await.unwrap();
    assert_eq!(conn.client().jobs().len(), 2);
}

#[test]
fn test_gcloud_application_default_login_file_is_used() {
    let dir = std::env::temp_dir().join("bq_adapter_integration_adc");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let adc = dir.join(GCLOUD_ADC_FILE);
    std::fs::write(
        &adc,
        r#"{"type": "authorized_user", "client_id": "id", "client_secret": "secret", "refresh_token": "token"}"#,
    )
    .unwrap();

    let ambient = AmbientEnvironment {
        project_env: Some("acme-co".into()),
        gcloud_config_dir: Some(dir.clone()),
        ..Default::default()
    };
    let adapter = BigQueryAdapter::new(AdapterConfig::default()).with_ambient(ambient);
    assert_eq!(adapter.credential_source().unwrap(), CredentialSource::AuthorizedUser(adc));

    let _ = std::fs::remove_dir_all(&dir);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_acme_scenario() {
    let conn = connect(Some("acme-co"), Some("EU"), acme_client());
    let tree = conn.load_catalog().await.unwrap();

    let jobs = conn.client().jobs();
    assert_eq!(jobs.len(), 2);
    assert!(jobs[0].sql.contains("FROM `region-EU`.INFORMATION_SCHEMA.TABLES"));
    assert!(jobs[0].sql.contains("table_catalog = 'acme-co'"));
    assert!(jobs[1].sql.contains("FROM `region-EU`.INFORMATION_SCHEMA.COLUMNS"));
    assert!(jobs[1].sql.contains("table_catalog = 'acme-co'"));
    assert!(jobs.iter().all(|j| j.project == "acme-co" && j.location == "EU"));

    assert_eq!(tree.project, "acme-co");
    assert_eq!(tree.datasets.len(), 1);
    let analytics = &tree.datasets[0];
    assert_eq!(analytics.name, "analytics");
    assert_eq!(analytics.tables.len(), 1);
    let events = &analytics.tables[0];
    assert_eq!(events.name, "events");
    let columns: Vec<&str> = events.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["id", "ts"]);
}

#[tokio::test]
async fn test_location_defaults_to_us_in_metadata_queries() {
    let conn = connect(Some("acme-co"), None, acme_client());
    conn.load_catalog().await.unwrap();

    for job in conn.client().jobs() {
        assert_eq!(job.location, "US");
        assert!(job.sql.contains("`region-US`.INFORMATION_SCHEMA."));
    }
}

#[tokio::test]
async fn test_exactly_two_queries_for_large_catalogs() {
    let mut relations = Vec::new();
    let mut columns = Vec::new();
    for d in 0..20 {
        for t in 0..25 {
            relations.push(relation(&format!("ds_{d}"), &format!("t_{t}"), "BASE TABLE", "TABLE"));
            for c in 0..10 {
                columns.push(column(&format!("ds_{d}"), &format!("t_{t}"), &format!("c_{c}"), "STRING", c + 1));
            }
        }
    }
    let client = MockClient::new()
        .on_query("INFORMATION_SCHEMA.TABLES", Ok(relations_page(relations)))
        .on_query("INFORMATION_SCHEMA.COLUMNS", Ok(columns_page(columns)));

    let conn = connect(Some("acme-co"), None, client);
    let tree = conn.load_catalog().await.unwrap();

    assert_eq!(conn.client().jobs().len(), 2);
    assert_eq!(tree.datasets.len(), 20);
    assert_eq!(tree.table_count(), 500);
    assert_eq!(tree.column_count(), 5000);
}

#[tokio::test]
async fn test_catalog_is_independent_of_row_order() {
    let relations = vec![
        relation("raw", "clicks", "EXTERNAL", "TABLE"),
        relation("analytics", "events", "BASE TABLE", "TABLE"),
        relation("analytics", "daily", "VIEW", "TABLE"),
        relation("analytics", "sessionize", "PROCEDURE", "ROUTINE"),
    ];
    let columns = vec![
        column("analytics", "events", "ts", "TIMESTAMP", 2),
        column("raw", "clicks", "url", "STRING", 1),
        column("analytics", "daily", "day", "DATE", 1),
        column("analytics", "events", "id", "INT64", 1),
        column("analytics", "daily", "n", "INT64", 2),
    ];

    let forward = MockClient::new()
        .on_query("INFORMATION_SCHEMA.TABLES", Ok(relations_page(relations.clone())))
        .on_query("INFORMATION_SCHEMA.COLUMNS", Ok(columns_page(columns.clone())));
    let reversed = MockClient::new()
        .on_query("INFORMATION_SCHEMA.TABLES", Ok(relations_page(relations.into_iter().rev().collect())))
        .on_query("INFORMATION_SCHEMA.COLUMNS", Ok(columns_page(columns.into_iter().rev().collect())));

    let a = connect(Some("acme-co"), None, forward).load_catalog().await.unwrap();
    let b = connect(Some("acme-co"), None, reversed).load_catalog().await.unwrap();
    assert_eq!(a, b);

    let analytics = a.dataset("analytics").unwrap();
    let tables: Vec<&str> = analytics.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tables, vec!["daily", "events"]);
    assert_eq!(analytics.routines[0].name, "sessionize");
    assert_eq!(a.dataset("raw").unwrap().tables[0].columns[0].name, "url");
}

#[tokio::test]
async fn test_tables_permission_failure_is_permission_error() {
    let denied = WarehouseError::access_denied(
        "Access Denied: Project acme-co: User does not have bigquery.tables.list permission in project acme-co.",
    );
    let client = MockClient::new().on_query("INFORMATION_SCHEMA.TABLES", Err(denied));
    let conn = connect(Some("acme-co"), None, client);

    match conn.load_catalog().await {
        Err(AdapterError::PermissionError { view, missing_permission, message }) => {
            assert_eq!(view, MetadataView::Tables);
            assert_eq!(missing_permission.as_deref(), Some("bigquery.tables.list"));
            assert!(message.starts_with("Access Denied: Project acme-co"));
        }
        other => panic!("expected PermissionError, got {other:?}"),
    }
    assert_eq!(conn.client().jobs().len(), 1);
}

#[tokio::test]
async fn test_columns_permission_failure_is_permission_error() {
    let denied = WarehouseError::access_denied("Access Denied: Table acme-co:analytics.events");
    let client = MockClient::new()
        .on_query("INFORMATION_SCHEMA.TABLES", Ok(relations_page(vec![])))
        .on_query("INFORMATION_SCHEMA.COLUMNS", Err(denied));
    let conn = connect(Some("acme-co"), None, client);

    let err = conn.load_catalog().await.unwrap_err();
    assert_eq!(err.error_code(), "PERMISSION_ERROR");
    match err {
        AdapterError::PermissionError { view, missing_permission, .. } => {
            assert_eq!(view, MetadataView::Columns);
            assert_eq!(missing_permission, None);
        }
        other => panic!("expected PermissionError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_catalog_items_for_host() {
    let conn = connect(Some("acme-co"), Some("EU"), acme_client());
    let catalog = conn.load_catalog().await.unwrap().to_catalog();

    let project = &catalog.items[0];
    let dataset = &project.children[0];
    let table = &dataset.children[0];
    let labels: Vec<(&str, &str)> =
        table.children.iter().map(|c| (c.label.as_str(), c.type_label.as_str())).collect();

    assert_eq!(project.label, "acme-co");
    assert_eq!(dataset.label, "analytics");
    assert_eq!(table.query_name, "`acme-co`.`analytics`.`events`");
    assert_eq!(labels, vec![("id", "#"), ("ts", "ts")]);
}

// ============================================================================
// Query execution
// ============================================================================

#[tokio::test]
async fn test_set_limit_over_three_rows() {
    let page = ResultPage::with_rows(
        vec![FieldInfo::new("a", "INTEGER")],
        vec![vec![json!("1")], vec![json!("2")], vec![json!("3")]],
    );
    let client = MockClient::new().on_query("union all", Ok(page));
    let conn = connect(Some("acme-co"), None, client);

    let stream = conn
        .execute("select 1 as a union all select 2 union all select 3")
        .await
        .unwrap()
        .expect("result set")
        .set_limit(2);
    let rows = stream.fetch_all().await.unwrap();
    assert_eq!(rows, vec![vec![json!("1")], vec![json!("2")]]);
}

#[tokio::test]
async fn test_multi_page_result_drains_in_order() {
    let fields = vec![FieldInfo::new("n", "INTEGER")];
    let cursor = |token: &str| PageCursor {
        project: "acme-co".into(),
        job_id: "job_42".into(),
        location: "US".into(),
        page_token: token.into(),
    };
    let client = MockClient::new()
        .on_query("generate_array", Ok(ResultPage::with_rows(fields.clone(), vec![vec![json!("1")]]).then(cursor("p2"))))
        .on_page("p2", Ok(ResultPage::with_rows(fields.clone(), vec![]).then(cursor("p3"))))
        .on_page("p3", Ok(ResultPage::with_rows(fields, vec![vec![json!("2")], vec![json!("3")]])));
    let conn = connect(Some("acme-co"), None, client);

    let stream = conn
        .execute("select n from unnest(generate_array(1, 3)) as n")
        .await
        .unwrap()
        .unwrap();
    let rows = stream.fetch_all().await.unwrap();
    assert_eq!(rows, vec![vec![json!("1")], vec![json!("2")], vec![json!("3")]]);
    assert_eq!(conn.client().page_requests(), vec!["p2".to_string(), "p3".to_string()]);
}

#[tokio::test]
async fn test_array_column_label() {
    let page = ResultPage::with_rows(
        vec![FieldInfo::new("tags", "STRING").repeated(), FieldInfo::new("meta", "RECORD")],
        vec![],
    );
    let conn = connect(Some("acme-co"), None, MockClient::new().on_query("select", Ok(page)));

    let stream = conn.execute("select tags, meta from t").await.unwrap().unwrap();
    let labels: Vec<String> = stream.columns().into_iter().map(|c| c.type_label).collect();
    assert_eq!(labels, vec!["[]".to_string(), "{}".to_string()]);
}
