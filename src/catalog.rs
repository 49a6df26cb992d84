//! Catalog Loading
//!
//! The catalog is built from exactly two metadata queries, both addressed at the
//! region-qualified `INFORMATION_SCHEMA` of the connected project:
//!
//! 1. `TABLES` combined with `ROUTINES` (`UNION ALL`): one row per table, view or routine
//! 2. `COLUMNS`: one row per column
//!
//! Rows are grouped on their naming columns into project → dataset → table/routine →
//! column. Grouping goes through ordered maps, so the tree does not depend on the order
//! rows come back in. The tree is read-only; a refresh builds a new one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AdapterError, MetadataView, Result};
use crate::types::{column_type_label, routine_type_label, table_type_label};

/// `object` column value for table rows in the relations query
const TABLE_OBJECT: &str = "TABLE";

/// `object` column value for routine rows in the relations query
const ROUTINE_OBJECT: &str = "ROUTINE";

/// Quote a value as a standard SQL string literal
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Region qualifier as a quoted identifier (`` `region-eu` ``)
fn region_qualifier(location: &str) -> String {
    format!("`region-{location}`")
}

/// Metadata query listing tables, views and routines
///
/// Columns: dataset, name, kind, object (`TABLE` | `ROUTINE`)
#[must_use]
pub fn relations_query(project: &str, location: &str) -> String {
    let region = region_qualifier(location);
    let project = quote_literal(project);
    format!(
        "SELECT table_schema AS dataset, table_name AS name, table_type AS kind, '{TABLE_OBJECT}' AS object\n\
         FROM {region}.INFORMATION_SCHEMA.TABLES\n\
         WHERE table_catalog = {project}\n\
         UNION ALL\n\
         SELECT routine_schema, routine_name, routine_type, '{ROUTINE_OBJECT}'\n\
         FROM {region}.INFORMATION_SCHEMA.ROUTINES\n\
         WHERE routine_catalog = {project}"
    )
}

/// Metadata query listing columns
///
/// Columns: dataset, table, name, data_type, ordinal_position
#[must_use]
pub fn columns_query(project: &str, location: &str) -> String {
    let region = region_qualifier(location);
    let project = quote_literal(project);
    format!(
        "SELECT table_schema AS dataset, table_name, column_name AS name, data_type, ordinal_position\n\
         FROM {region}.INFORMATION_SCHEMA.COLUMNS\n\
         WHERE table_catalog = {project}"
    )
}

/// Loaded catalog for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTree {
    pub project: String,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub tables: Vec<Table>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routines: Vec<Routine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,

    /// `table_type` (`BASE TABLE`, `VIEW`, ...); `None` when only seen in `COLUMNS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,

    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub routine_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub ordinal_position: i64,
}

/// Row of the relations query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationRow {
    Table { dataset: String, name: String, table_type: String },
    Routine { dataset: String, name: String, routine_type: String },
}

/// Row of the columns query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub dataset: String,
    pub table: String,
    pub column: Column,
}

#[derive(Default)]
struct DatasetAcc {
    tables: BTreeMap<String, TableAcc>,
    routines: BTreeMap<String, String>,
}

#[derive(Default)]
struct TableAcc {
    table_type: Option<String>,
    columns: Vec<Column>,
}

impl CatalogTree {
    /// Group metadata rows into a tree
    ///
    /// Datasets, tables and routines come out sorted by name, columns by ordinal
    /// position then name. Columns whose table never appeared in the relations rows
    /// still get a table, with no type.
    #[must_use]
    pub fn from_rows(
        project: impl Into<String>,
        relations: impl IntoIterator<Item = RelationRow>,
        columns: impl IntoIterator<Item = ColumnRow>,
    ) -> Self {
        let mut datasets: BTreeMap<String, DatasetAcc> = BTreeMap::new();

        for relation in relations {
            match relation {
                RelationRow::Table { dataset, name, table_type } => {
                    let table = datasets.entry(dataset).or_default().tables.entry(name).or_default();
                    // Duplicate rows keep the smallest type so the outcome is order-free
                    table.table_type = Some(match table.table_type.take() {
                        Some(existing) => existing.min(table_type),
                        None => table_type,
                    });
                }
                RelationRow::Routine { dataset, name, routine_type } => {
                    let routines = &mut datasets.entry(dataset).or_default().routines;
                    let entry = routines.entry(name).or_insert_with(|| routine_type.clone());
                    if routine_type < *entry {
                        *entry = routine_type;
                    }
                }
            }
        }

        for row in columns {
            datasets
                .entry(row.dataset)
                .or_default()
                .tables
                .entry(row.table)
                .or_default()
                .columns
                .push(row.column);
        }

        let datasets = datasets
            .into_iter()
            .map(|(name, acc)| Dataset {
                name,
                tables: acc
                    .tables
                    .into_iter()
                    .map(|(name, mut table)| {
                        table.columns.sort_by(|a, b| {
                            a.ordinal_position
                                .cmp(&b.ordinal_position)
                                .then_with(|| a.name.cmp(&b.name))
                                .then_with(|| a.data_type.cmp(&b.data_type))
                        });
                        Table { name, table_type: table.table_type, columns: table.columns }
                    })
                    .collect(),
                routines: acc
                    .routines
                    .into_iter()
                    .map(|(name, routine_type)| Routine { name, routine_type })
                    .collect(),
            })
            .collect();

        Self { project: project.into(), datasets }
    }

    /// Look up a dataset by name
    #[must_use]
    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn table_count(&self) -> usize {
        self.datasets.iter().map(|d| d.tables.len()).sum()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.datasets.iter().flat_map(|d| &d.tables).map(|t| t.columns.len()).sum()
    }

    /// Render the tree as the host's catalog items
    #[must_use]
    pub fn to_catalog(&self) -> Catalog {
        let project_id = quote_ident(&self.project);

        let datasets = self
            .datasets
            .iter()
            .map(|dataset| {
                let dataset_id = format!("{project_id}.{}", quote_ident(&dataset.name));

                let tables = dataset.tables.iter().map(|table| {
                    let table_id = format!("{dataset_id}.{}", quote_ident(&table.name));
                    let columns = table
                        .columns
                        .iter()
                        .map(|column| CatalogItem {
                            qualified_identifier: format!("{table_id}.{}", quote_ident(&column.name)),
                            query_name: quote_ident(&column.name),
                            label: column.name.clone(),
                            type_label: column_type_label(&column.data_type).to_string(),
                            children: Vec::new(),
                        })
                        .collect();

                    CatalogItem {
                        qualified_identifier: table_id.clone(),
                        query_name: table_id,
                        label: table.name.clone(),
                        type_label: table
                            .table_type
                            .as_deref()
                            .map_or("?", table_type_label)
                            .to_string(),
                        children: columns,
                    }
                });

                let routines = dataset.routines.iter().map(|routine| {
                    let routine_id = format!("{dataset_id}.{}", quote_ident(&routine.name));
                    CatalogItem {
                        qualified_identifier: routine_id.clone(),
                        query_name: routine_id,
                        label: routine.name.clone(),
                        type_label: routine_type_label(&routine.routine_type).to_string(),
                        children: Vec::new(),
                    }
                });

                let children = tables.chain(routines).collect();
                CatalogItem {
                    qualified_identifier: dataset_id.clone(),
                    query_name: dataset_id,
                    label: dataset.name.clone(),
                    type_label: "ds".to_string(),
                    children,
                }
            })
            .collect();

        Catalog {
            items: vec![CatalogItem {
                qualified_identifier: project_id.clone(),
                query_name: project_id,
                label: self.project.clone(),
                type_label: "proj".to_string(),
                children: datasets,
            }],
        }
    }
}

/// Catalog as rendered by the host's browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
}

/// One node of the host catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Backtick-quoted path, unique within the catalog
    pub qualified_identifier: String,

    /// Text inserted into the editor when the item is picked
    pub query_name: String,

    pub label: String,
    pub type_label: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CatalogItem>,
}

/// Quote an identifier with backticks
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "\\`"))
}

fn cell<'a>(row: &'a [serde_json::Value], idx: usize, name: &str, view: MetadataView) -> Result<&'a str> {
    row.get(idx).and_then(serde_json::Value::as_str).ok_or_else(|| {
        AdapterError::query(format!("Malformed INFORMATION_SCHEMA.{view} row: missing '{name}'"))
    })
}

/// Parse one row of [`relations_query`]
pub fn parse_relation_row(row: &[serde_json::Value]) -> Result<RelationRow> {
    let view = MetadataView::Tables;
    let dataset = cell(row, 0, "dataset", view)?.to_string();
    let name = cell(row, 1, "name", view)?.to_string();
    let kind = row.get(2).and_then(serde_json::Value::as_str).unwrap_or_default().to_string();

    match cell(row, 3, "object", view)? {
        TABLE_OBJECT => Ok(RelationRow::Table { dataset, name, table_type: kind }),
        ROUTINE_OBJECT => Ok(RelationRow::Routine { dataset, name, routine_type: kind }),
        other => Err(AdapterError::query(format!(
            "Malformed INFORMATION_SCHEMA.{view} row: unexpected object '{other}'"
        ))),
    }
}

/// Parse one row of [`columns_query`]
pub fn parse_column_row(row: &[serde_json::Value]) -> Result<ColumnRow> {
    let view = MetadataView::Columns;
    let dataset = cell(row, 0, "dataset", view)?.to_string();
    let table = cell(row, 1, "table", view)?.to_string();
    let name = cell(row, 2, "name", view)?.to_string();
    let data_type = row.get(3).and_then(serde_json::Value::as_str).unwrap_or_default().to_string();

    // The REST API returns INT64 cells as strings
    let ordinal_position = match row.get(4) {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        _ => None,
    }
    .ok_or_else(|| {
        AdapterError::query(format!("Malformed INFORMATION_SCHEMA.{view} row: bad 'ordinal_position'"))
    })?;

    Ok(ColumnRow { dataset, table, column: Column { name, data_type, ordinal_position } })
}
