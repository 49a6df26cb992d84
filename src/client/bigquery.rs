//! BigQuery client backed by `gcp-bigquery-client`
//!
//! # Implementation Notes
//! - The client is built from a [`CredentialSource`] chosen by the adapter: a service
//!   account key, gcloud's `authorized_user` ADC file, or the metadata server. The
//!   library's own ADC lookup only reads `GOOGLE_APPLICATION_CREDENTIALS` and the
//!   metadata server, so the gcloud file is loaded explicitly.
//! - Building a client fetches no token. `check_credentials` forces one with a dry-run
//!   query, which creates no job and bills nothing.
//! - Queries go through `jobs.query` with standard SQL and the configured location.
//! - When the first response arrives before the job completes, `jobs.getQueryResults` is
//!   polled until it does. The server holds each call open, so there is no client sleep.
//! - Cell values are passed through as the REST API returns them.

use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::get_query_results_response::GetQueryResultsResponse;
use gcp_bigquery_client::model::job_reference::JobReference;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::table_row::TableRow;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::Client;
use tracing::debug;

use crate::client::{
    FieldInfo, PageCursor, QueryJob, ResultPage, WarehouseClient, WarehouseError,
    WarehouseErrorKind,
};
use crate::config::CredentialSource;

/// Statement dry-run to confirm credentials
const CREDENTIAL_CHECK_SQL: &str = "SELECT 1";

/// Live BigQuery client
pub struct BigQueryClient {
    client: Client,
}

impl BigQueryClient {
    /// Build a client from the given credential source
    ///
    /// Fails with an `Unauthenticated` error when the credentials file cannot be loaded.
    pub async fn from_credentials(source: &CredentialSource) -> Result<Self, WarehouseError> {
        let result = match source {
            CredentialSource::ServiceAccountKey(path) => {
                Client::from_service_account_key_file(&path.to_string_lossy()).await
            }
            CredentialSource::AuthorizedUser(path) => {
                Client::from_authorized_user_secret(&path.to_string_lossy()).await
            }
            CredentialSource::MetadataServer => Client::from_application_default_credentials().await,
        };

        let client = result.map_err(|e| {
            WarehouseError::unauthenticated(format!("Failed to load credentials ({source:?}): {e}"))
        })?;

        Ok(Self { client })
    }

    async fn wait_for_completion(
        &self,
        project: &str,
        location: &str,
        job_id: &str,
    ) -> Result<GetQueryResultsResponse, WarehouseError> {
        loop {
            let params = GetQueryResultsParameters {
                location: Some(location.to_string()),
                ..Default::default()
            };
            let response = self
                .client
                .job()
                .get_query_results(project, job_id, params)
                .await
                .map_err(classify)?;

            if response.job_complete.unwrap_or(true) {
                return Ok(response);
            }
            debug!(job_id, "job still running");
        }
    }
}

impl WarehouseClient for BigQueryClient {
    async fn check_credentials(&self, project: &str, location: &str) -> Result<(), WarehouseError> {
        let mut request = QueryRequest::new(CREDENTIAL_CHECK_SQL.to_string());
        request.use_legacy_sql = false;
        request.dry_run = Some(true);
        request.location = Some(location.to_string());

        self.client.job().query(project, request).await.map(|_| ()).map_err(classify)
    }

    async fn run_query(&self, job: &QueryJob) -> Result<ResultPage, WarehouseError> {
        let mut request = QueryRequest::new(job.sql.clone());
        request.use_legacy_sql = false;
        request.location = Some(job.location.clone());

        let response = self.client.job().query(&job.project, request).await.map_err(classify)?;

        if response.job_complete.unwrap_or(true) {
            return Ok(to_page(
                response.schema,
                response.rows,
                response.page_token,
                response.job_reference.as_ref(),
                job,
            ));
        }

        let job_id = response
            .job_reference
            .as_ref()
            .and_then(|r| r.job_id.clone())
            .ok_or_else(|| WarehouseError::new(WarehouseErrorKind::Other, "Incomplete job has no job id"))?;

        let response = self.wait_for_completion(&job.project, &job.location, &job_id).await?;
        Ok(to_page(
            response.schema,
            response.rows,
            response.page_token,
            response.job_reference.as_ref(),
            job,
        ))
    }

    async fn fetch_page(&self, cursor: &PageCursor) -> Result<ResultPage, WarehouseError> {
        debug!(job_id = %cursor.job_id, "fetching next result page");

        let params = GetQueryResultsParameters {
            location: Some(cursor.location.clone()),
            page_token: Some(cursor.page_token.clone()),
            ..Default::default()
        };
        let response = self
            .client
            .job()
            .get_query_results(&cursor.project, &cursor.job_id, params)
            .await
            .map_err(classify)?;

        let rows = convert_rows(response.rows);
        let next_page = response.page_token.map(|page_token| PageCursor { page_token, ..cursor.clone() });

        Ok(ResultPage { fields: response.schema.map(convert_schema), rows, next_page })
    }
}

fn to_page(
    schema: Option<TableSchema>,
    rows: Option<Vec<TableRow>>,
    page_token: Option<String>,
    job_reference: Option<&JobReference>,
    job: &QueryJob,
) -> ResultPage {
    let next_page = match (page_token, job_reference.and_then(|r| r.job_id.clone())) {
        (Some(page_token), Some(job_id)) => Some(PageCursor {
            project: job.project.clone(),
            job_id,
            location: job_reference
                .and_then(|r| r.location.clone())
                .unwrap_or_else(|| job.location.clone()),
            page_token,
        }),
        _ => None,
    };

    ResultPage { fields: schema.map(convert_schema), rows: convert_rows(rows), next_page }
}

fn convert_schema(schema: TableSchema) -> Vec<FieldInfo> {
    schema
        .fields
        .unwrap_or_default()
        .into_iter()
        .map(|field| {
            // FieldType serializes to its REST name (INTEGER, STRING, RECORD, ...)
            let data_type = serde_json::to_value(&field.r#type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_uppercase))
                .unwrap_or_default();
            FieldInfo {
                name: field.name,
                data_type,
                repeated: field.mode.as_deref().is_some_and(|m| m.eq_ignore_ascii_case("REPEATED")),
            }
        })
        .collect()
}

fn convert_rows(rows: Option<Vec<TableRow>>) -> Vec<Vec<serde_json::Value>> {
    rows.unwrap_or_default()
        .into_iter()
        .map(|row| {
            row.columns
                .unwrap_or_default()
                .into_iter()
                .map(|cell| cell.value.unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect()
}

/// Map a client library error onto a [`WarehouseErrorKind`], keeping the native message
fn classify(err: BQError) -> WarehouseError {
    match &err {
        BQError::ResponseError { error } => {
            let kind = kind_for_status(error.error.code);
            WarehouseError::new(kind, error.error.message.clone())
        }
        BQError::RequestError(_) => WarehouseError::new(WarehouseErrorKind::Transport, err.to_string()),
        BQError::AuthError(_) | BQError::YupAuthError(_) | BQError::NoToken => {
            WarehouseError::unauthenticated(err.to_string())
        }
        _ => WarehouseError::new(WarehouseErrorKind::Other, err.to_string()),
    }
}

/// HTTP status of a BigQuery error response to an error kind
fn kind_for_status(code: i64) -> WarehouseErrorKind {
    match code {
        400 => WarehouseErrorKind::InvalidQuery,
        401 => WarehouseErrorKind::Unauthenticated,
        403 => WarehouseErrorKind::AccessDenied,
        404 => WarehouseErrorKind::NotFound,
        _ => WarehouseErrorKind::Other,
    }
}
