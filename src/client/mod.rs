//! Warehouse Client Seam
//!
//! The adapter never talks HTTP itself. Everything goes through [`WarehouseClient`],
//! a narrow trait over the client library: confirm credentials, run a query job, and
//! fetch the next page of a job's results.
//!
//! - [`bigquery::BigQueryClient`] is backed by `gcp-bigquery-client` and ADC.
//! - [`mock::MockClient`] answers from canned pages and records every job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;

pub mod bigquery;
#[doc(hidden)]
pub mod mock;

/// A single SQL job as submitted to the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryJob {
    /// Project the job runs (and is billed) in
    pub project: String,

    /// Region the job runs in
    pub location: String,

    /// Standard SQL text, passed verbatim
    pub sql: String,
}

impl QueryJob {
    #[must_use]
    pub fn new(project: impl Into<String>, location: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { project: project.into(), location: location.into(), sql: sql.into() }
    }
}

/// Result schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,

    /// Type name as reported by the warehouse (`INTEGER`, `STRING`, `RECORD`, ...)
    pub data_type: String,

    /// `REPEATED` mode (an ARRAY column)
    #[serde(default)]
    pub repeated: bool,
}

impl FieldInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { name: name.into(), data_type: data_type.into(), repeated: false }
    }

    #[must_use]
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// Position of the next page of a job's results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub project: String,
    pub job_id: String,
    pub location: String,
    pub page_token: String,
}

/// One page of results as returned by the client library
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Result schema; `None` when the statement produced no result set (DDL/DML)
    pub fields: Option<Vec<FieldInfo>>,

    /// Raw cell values, positionally aligned with `fields`
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Cursor for the following page, if any
    pub next_page: Option<PageCursor>,
}

impl ResultPage {
    /// A page with a schema and rows, and no further pages
    #[must_use]
    pub fn with_rows(fields: Vec<FieldInfo>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { fields: Some(fields), rows, next_page: None }
    }

    /// A statement with no result set
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, cursor: PageCursor) -> Self {
        self.next_page = Some(cursor);
        self
    }
}

/// Classification of a client library failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseErrorKind {
    /// Credentials missing, invalid or expired
    Unauthenticated,
    /// Caller lacks an IAM permission
    AccessDenied,
    /// Referenced project, dataset, table or job does not exist
    NotFound,
    /// SQL rejected by the warehouse
    InvalidQuery,
    /// Network or transport failure
    Transport,
    Other,
}

impl fmt::Display for WarehouseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AccessDenied => "access denied",
            Self::NotFound => "not found",
            Self::InvalidQuery => "invalid query",
            Self::Transport => "transport",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`WarehouseClient`], carrying the native message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct WarehouseError {
    pub kind: WarehouseErrorKind,
    pub message: String,
}

impl WarehouseError {
    pub fn new(kind: WarehouseErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::AccessDenied, message)
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::InvalidQuery, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(WarehouseErrorKind::Unauthenticated, message)
    }

    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self.kind, WarehouseErrorKind::Unauthenticated)
    }

    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self.kind, WarehouseErrorKind::AccessDenied)
    }
}

/// Query surface of the warehouse client library
///
/// Implementations perform exactly one round trip per call (plus whatever the library
/// does internally to wait for job completion). No retries happen at this level.
pub trait WarehouseClient: Send + Sync {
    /// Confirm the credentials are accepted, without running a job
    fn check_credentials(
        &self,
        project: &str,
        location: &str,
    ) -> impl Future<Output = Result<(), WarehouseError>> + Send;

    /// Submit a query job and return its first page
    fn run_query(
        &self,
        job: &QueryJob,
    ) -> impl Future<Output = Result<ResultPage, WarehouseError>> + Send;

    /// Fetch the page a cursor points at
    fn fetch_page(
        &self,
        cursor: &PageCursor,
    ) -> impl Future<Output = Result<ResultPage, WarehouseError>> + Send;
}
