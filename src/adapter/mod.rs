//! Adapter Contract and Core Types
//!
//! This module defines what the IDE host sees: an [`Adapter`] that connects, and the
//! [`Connection`] it returns, which executes SQL and loads the catalog.
//!
//! # Pass-through Design
//! The connection owns a [`WarehouseClient`] and the resolved project/location, and
//! nothing else. SQL is passed verbatim, rows are passed through untouched, and every
//! client failure is wrapped once and returned. There are no retries, no caching and
//! no deadlines at this layer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::catalog::{columns_query, parse_column_row, parse_relation_row, relations_query, CatalogTree};
use crate::client::{FieldInfo, PageCursor, QueryJob, WarehouseClient, WarehouseError};
use crate::completion::{completions, Completion};
use crate::config::{AdapterOption, ResolvedConfig, ADAPTER_OPTIONS};
use crate::error::{AdapterError, MetadataView, Result};
use crate::types::field_type_label;

pub mod bigquery;

/// IAM permissions the metadata queries depend on
pub const METADATA_PERMISSIONS: [&str; 4] = [
    "bigquery.tables.get",
    "bigquery.tables.list",
    "bigquery.routines.get",
    "bigquery.routines.list",
];

/// Predefined roles that grant every permission in [`METADATA_PERMISSIONS`]
pub const METADATA_ROLES: [&str; 3] =
    ["roles/bigquery.admin", "roles/bigquery.dataViewer", "roles/bigquery.metadataViewer"];

/// Adapter registration contract
///
/// The host discovers the adapter by name, renders its options, and calls
/// `connect` once per session.
pub trait Adapter {
    /// Name the host registers the adapter under
    const NAME: &'static str;

    /// Client the resulting connection talks through
    type Client: WarehouseClient;

    /// Options the adapter recognizes
    fn options() -> &'static [AdapterOption] {
        &ADAPTER_OPTIONS
    }

    /// Resolve configuration and open a connection
    fn connect(&self) -> impl Future<Output = Result<Connection<Self::Client>>> + Send;
}

/// Result column as shown in the results header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub name: String,
    pub type_label: String,
}

/// Live connection for one IDE session
pub struct Connection<C> {
    client: C,
    settings: ResolvedConfig,
}

impl<C: WarehouseClient> Connection<C> {
    #[must_use]
    pub fn new(client: C, settings: ResolvedConfig) -> Self {
        Self { client, settings }
    }

    /// Resolved project and location
    #[must_use]
    pub fn settings(&self) -> &ResolvedConfig {
        &self.settings
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn job(&self, sql: impl Into<String>) -> QueryJob {
        QueryJob::new(&self.settings.project, &self.settings.location, sql)
    }

    /// Execute SQL verbatim
    ///
    /// Returns `None` when the statement produced no result set (DDL, most DML).
    /// Any failure is a `QueryError` carrying the warehouse's message.
    pub async fn execute(&self, sql: &str) -> Result<Option<RowStream<'_, C>>> {
        debug!(project = %self.settings.project, location = %self.settings.location, "executing query");

        let page = self.client.run_query(&self.job(sql)).await.map_err(|e| AdapterError::query(e.message))?;

        Ok(page.fields.map(|fields| RowStream {
            client: &self.client,
            fields,
            buffer: page.rows.into(),
            next_page: page.next_page,
            limit: None,
            yielded: 0,
        }))
    }

    /// Load the catalog with exactly two metadata queries
    ///
    /// An authorization failure on either query is a `PermissionError` naming the view,
    /// and the missing permission when the warehouse's message names one.
    pub async fn load_catalog(&self) -> Result<CatalogTree> {
        let ResolvedConfig { project, location } = &self.settings;

        let relation_rows = self
            .metadata_rows(relations_query(project, location), MetadataView::Tables)
            .await?;
        let column_rows = self
            .metadata_rows(columns_query(project, location), MetadataView::Columns)
            .await?;

        let relations = relation_rows.iter().map(|r| parse_relation_row(r)).collect::<Result<Vec<_>>>()?;
        let columns = column_rows.iter().map(|r| parse_column_row(r)).collect::<Result<Vec<_>>>()?;

        let tree = CatalogTree::from_rows(project.clone(), relations, columns);
        info!(
            project = %project,
            datasets = tree.datasets.len(),
            tables = tree.table_count(),
            columns = tree.column_count(),
            "catalog loaded"
        );
        Ok(tree)
    }

    /// Static completions for the editor
    #[must_use]
    pub fn completions(&self) -> Vec<Completion> {
        completions()
    }

    async fn metadata_rows(&self, sql: String, view: MetadataView) -> Result<Vec<Vec<serde_json::Value>>> {
        let to_error = move |err: WarehouseError| metadata_error(view, err);
        debug!(view = %view, "issuing metadata query");

        let page = self.client.run_query(&self.job(sql)).await.map_err(to_error)?;

        let mut rows = page.rows;
        let mut next_page = page.next_page;
        while let Some(cursor) = next_page {
            let page = self.client.fetch_page(&cursor).await.map_err(to_error)?;
            rows.extend(page.rows);
            next_page = page.next_page;
        }

        Ok(rows)
    }
}

/// Wrap a metadata query failure
fn metadata_error(view: MetadataView, err: WarehouseError) -> AdapterError {
    if err.is_access_denied() {
        let missing = missing_permission(&err.message);
        warn!(view = %view, missing = ?missing, "metadata query denied");
        AdapterError::permission(view, missing, err.message)
    } else {
        AdapterError::query(err.message)
    }
}

/// First metadata permission named in `message`, matched as a whole word
///
/// Neither `bigquery.tables.getData` nor `xbigquery.tables.get` counts as
/// `bigquery.tables.get`.
#[must_use]
pub fn missing_permission(message: &str) -> Option<String> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let mut found: Vec<(usize, &str)> = METADATA_PERMISSIONS
        .iter()
        .filter_map(|perm| {
            message.match_indices(perm).find_map(|(idx, _)| {
                let before = message[..idx].chars().next_back();
                let after = message[idx + perm.len()..].chars().next();
                // A trailing '.' may end the sentence; a leading one extends the name
                let boundary =
                    !before.is_some_and(|c| is_word(c) || c == '.') && !after.is_some_and(is_word);
                boundary.then_some((idx, *perm))
            })
        })
        .collect();

    found.sort_unstable();
    found.first().map(|(_, perm)| (*perm).to_string())
}

/// Lazy, forward-only cursor over a query's rows
///
/// Rows of the first page arrive with the query response. Each further page is fetched
/// only once the rows before it have been consumed. A cursor cannot be rewound.
pub struct RowStream<'c, C> {
    client: &'c C,
    fields: Vec<FieldInfo>,
    buffer: VecDeque<Vec<serde_json::Value>>,
    next_page: Option<PageCursor>,
    limit: Option<usize>,
    yielded: usize,
}

impl<C: WarehouseClient> RowStream<'_, C> {
    /// Column names and type labels, duplicates preserved
    #[must_use]
    pub fn columns(&self) -> Vec<ResultColumn> {
        self.fields
            .iter()
            .map(|f| ResultColumn {
                name: f.name.clone(),
                type_label: field_type_label(&f.data_type, f.repeated).to_string(),
            })
            .collect()
    }

    /// Cap the number of rows this cursor yields
    #[must_use]
    pub fn set_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Next row, fetching the next page when the current one is exhausted
    pub async fn next_row(&mut self) -> Result<Option<Vec<serde_json::Value>>> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return Ok(None);
        }

        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(row));
            }

            let Some(cursor) = self.next_page.take() else {
                return Ok(None);
            };

            let page = self
                .client
                .fetch_page(&cursor)
                .await
                .map_err(|e| AdapterError::query(e.message))?;
            self.buffer.extend(page.rows);
            self.next_page = page.next_page;
        }
    }

    /// Drain the cursor, up to its limit
    pub async fn fetch_all(mut self) -> Result<Vec<Vec<serde_json::Value>>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }
}
