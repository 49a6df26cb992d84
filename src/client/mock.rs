//! In-memory warehouse client for testing
//!
//! `MockClient` never touches the network. It answers each job from responses
//! registered against a SQL fragment, serves follow-up pages by token, and records
//! every job and page request it sees so tests can assert on exactly what was issued.
//!
//! ```rust,ignore
//! let client = MockClient::new()
//!     .on_query("INFORMATION_SCHEMA.TABLES", Ok(tables_page))
//!     .on_query("INFORMATION_SCHEMA.COLUMNS", Err(WarehouseError::access_denied("...")));
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::{PageCursor, QueryJob, ResultPage, WarehouseClient, WarehouseError};

type Response = Result<ResultPage, WarehouseError>;

/// Mock warehouse client
#[derive(Default)]
pub struct MockClient {
    /// (SQL fragment, response), matched in registration order
    responses: Vec<(String, Response)>,

    /// Follow-up pages by page token
    pages: HashMap<String, Response>,

    /// Every job submitted, in order
    jobs: Mutex<Vec<QueryJob>>,

    /// Every page token requested, in order
    page_requests: Mutex<Vec<String>>,

    /// Failure returned by `check_credentials`
    credential_failure: Option<WarehouseError>,

    /// Number of credential checks made
    credential_checks: Mutex<usize>,
}

impl MockClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer jobs whose SQL contains `fragment`
    #[must_use]
    pub fn on_query(mut self, fragment: impl Into<String>, response: Response) -> Self {
        self.responses.push((fragment.into(), response));
        self
    }

    /// Serve `response` for the page identified by `page_token`
    #[must_use]
    pub fn on_page(mut self, page_token: impl Into<String>, response: Response) -> Self {
        self.pages.insert(page_token.into(), response);
        self
    }

    /// Reject credential checks with `error`
    #[must_use]
    pub fn with_credential_failure(mut self, error: WarehouseError) -> Self {
        self.credential_failure = Some(error);
        self
    }

    /// Credential checks made so far
    pub fn credential_checks(&self) -> usize {
        self.credential_checks.lock().map(|n| *n).unwrap_or_default()
    }

    /// Jobs submitted so far
    pub fn jobs(&self) -> Vec<QueryJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    /// Page tokens requested so far
    pub fn page_requests(&self) -> Vec<String> {
        self.page_requests.lock().map(|reqs| reqs.clone()).unwrap_or_default()
    }
}

impl WarehouseClient for MockClient {
    async fn check_credentials(&self, _project: &str, _location: &str) -> Result<(), WarehouseError> {
        if let Ok(mut checks) = self.credential_checks.lock() {
            *checks += 1;
        }

        match &self.credential_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn run_query(&self, job: &QueryJob) -> Result<ResultPage, WarehouseError> {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job.clone());
        }

        self.responses
            .iter()
            .find(|(fragment, _)| job.sql.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Ok(ResultPage::empty()))
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<ResultPage, WarehouseError> {
        if let Ok(mut reqs) = self.page_requests.lock() {
            reqs.push(cursor.page_token.clone());
        }

        self.pages.get(&cursor.page_token).cloned().unwrap_or_else(|| {
            Err(WarehouseError::new(
                crate::client::WarehouseErrorKind::NotFound,
                format!("Unknown page token: {}", cursor.page_token),
            ))
        })
    }
}
