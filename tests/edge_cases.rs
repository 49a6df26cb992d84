//! Edge Case Tests
//!
//! Less common inputs the adapter must pass through or reject cleanly:
//! - Unicode, NULL and nested cell values
//! - Identifiers that need quoting
//! - Empty projects and orphaned columns
//! - Malformed metadata rows

use bigquery_adapter::catalog::{columns_query, relations_query};
use bigquery_adapter::client::mock::MockClient;
use bigquery_adapter::client::{FieldInfo, ResultPage};
use bigquery_adapter::{AdapterConfig, AdapterError, AmbientEnvironment, BigQueryAdapter, Connection};
use serde_json::json;

fn connect(client: MockClient) -> Connection<MockClient> {
    BigQueryAdapter::new(AdapterConfig::new(Some("acme-co".into()), Some("asia-northeast1".into())))
        .with_ambient(AmbientEnvironment::empty())
        .connect_with(client)
        .expect("connect should succeed")
}

#[tokio::test]
async fn test_cells_pass_through_untouched() {
    let nested = json!({"f": [{"v": "a"}, {"v": null}]});
    let page = ResultPage::with_rows(
        vec![
            FieldInfo::new("s", "STRING"),
            FieldInfo::new("n", "INTEGER"),
            FieldInfo::new("r", "RECORD"),
        ],
        vec![vec![json!("日本語 🚀"), serde_json::Value::Null, nested.clone()]],
    );
    let conn = connect(MockClient::new().on_query("select", Ok(page)));

    let rows = conn.execute("select s, n, r from t").await.unwrap().unwrap().fetch_all().await.unwrap();
    assert_eq!(rows, vec![vec![json!("日本語 🚀"), serde_json::Value::Null, nested]]);
}

#[tokio::test]
async fn test_sql_with_comments_and_whitespace_is_not_altered() {
    let sql = "  -- leading comment\n\tselect 'it''s' /* inline */ as x ;  \n";
    let conn = connect(MockClient::new());

    let _ = conn.execute(sql).await.unwrap();
    assert_eq!(conn.client().jobs()[0].sql, sql);
}

#[tokio::test]
async fn test_empty_project_yields_empty_tree() {
    let conn = connect(MockClient::new());
    let tree = conn.load_catalog().await.unwrap();

    assert_eq!(tree.project, "acme-co");
    assert!(tree.datasets.is_empty());
    assert_eq!(tree.to_catalog().items[0].children.len(), 0);
}

#[tokio::test]
async fn test_columns_without_relation_still_appear() {
    let columns = ResultPage::with_rows(
        vec![
            FieldInfo::new("dataset", "STRING"),
            FieldInfo::new("table", "STRING"),
            FieldInfo::new("name", "STRING"),
            FieldInfo::new("data_type", "STRING"),
            FieldInfo::new("ordinal_position", "INTEGER"),
        ],
        vec![vec![json!("staging"), json!("tmp"), json!("x"), json!("STRING"), json!("1")]],
    );
    let conn = connect(MockClient::new().on_query("INFORMATION_SCHEMA.COLUMNS", Ok(columns)));
    let tree = conn.load_catalog().await.unwrap();

    let tmp = &tree.dataset("staging").unwrap().tables[0];
    assert_eq!(tmp.name, "tmp");
    assert_eq!(tmp.table_type, None);
    assert_eq!(tree.to_catalog().items[0].children[0].children[0].type_label, "?");
}

#[tokio::test]
async fn test_malformed_metadata_row_is_query_error() {
    let relations = ResultPage::with_rows(
        vec![FieldInfo::new("dataset", "STRING")],
        vec![vec![json!("analytics")]],
    );
    let conn = connect(MockClient::new().on_query("INFORMATION_SCHEMA.TABLES", Ok(relations)));

    assert!(matches!(conn.load_catalog().await, Err(AdapterError::QueryError(_))));
}

#[test]
fn test_identifiers_needing_quotes() {
    let tree = bigquery_adapter::CatalogTree::from_rows(
        "acme-co",
        vec![bigquery_adapter::catalog::RelationRow::Table {
            dataset: "raw".into(),
            name: "order-lines".into(),
            table_type: "BASE TABLE".into(),
        }],
        Vec::new(),
    );
    let table = &tree.to_catalog().items[0].children[0].children[0];
    assert_eq!(table.query_name, "`acme-co`.`raw`.`order-lines`");
}

#[test]
fn test_metadata_queries_use_regional_qualifier() {
    let tables = relations_query("acme-co", "asia-northeast1");
    let columns = columns_query("acme-co", "asia-northeast1");

    assert!(tables.contains("`region-asia-northeast1`.INFORMATION_SCHEMA.TABLES"));
    assert!(tables.contains("`region-asia-northeast1`.INFORMATION_SCHEMA.ROUTINES"));
    assert!(columns.contains("`region-asia-northeast1`.INFORMATION_SCHEMA.COLUMNS"));
    assert!(!tables.contains("INFORMATION_SCHEMA.COLUMNS"));
}

#[test]
fn test_location_is_case_insensitive_for_multi_regions() {
    for location in ["US", "EU", "us", "europe-west2"] {
        let result = BigQueryAdapter::new(AdapterConfig::new(Some("acme-co".into()), Some(location.into())))
            .with_ambient(AmbientEnvironment::empty())
            .resolve();
        assert!(result.is_ok(), "{location} should be accepted");
    }
}
