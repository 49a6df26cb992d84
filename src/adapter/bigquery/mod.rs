//! BigQuery Adapter
//!
//! Resolves the two options, picks an ambient credential source, builds a
//! [`BigQueryClient`] from it, and confirms the credentials before handing out a
//! connection.
//!
//! # Failure Order
//! Project resolution and option validation run first. A session with no resolvable
//! project therefore fails with `ConfigurationError` even when credentials are also
//! missing, and never touches the network. Missing or rejected credentials fail with
//! `AuthenticationError` at connect, not on the first query.

use tracing::{debug, info, warn};

use crate::adapter::{Adapter, Connection};
use crate::client::bigquery::BigQueryClient;
use crate::client::WarehouseClient;
use crate::config::{AdapterConfig, AmbientEnvironment, CredentialSource, ResolvedConfig};
use crate::error::{AdapterError, Result};

const NO_CREDENTIALS: &str = "No Application Default Credentials found. Run \
     'gcloud auth application-default login' or set GOOGLE_APPLICATION_CREDENTIALS";

/// BigQuery adapter
#[derive(Debug, Clone)]
pub struct BigQueryAdapter {
    config: AdapterConfig,
    ambient: AmbientEnvironment,
}

impl BigQueryAdapter {
    /// Adapter reading ambient defaults from the running process
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        Self { config, ambient: AmbientEnvironment::from_process() }
    }

    /// Replace the ambient environment used for project and credential discovery
    #[must_use]
    pub fn with_ambient(mut self, ambient: AmbientEnvironment) -> Self {
        self.ambient = ambient;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Resolve project and location without connecting
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.config.resolve(&self.ambient)
    }

    /// Ambient credential source, or `AuthenticationError` when there is none
    pub fn credential_source(&self) -> Result<CredentialSource> {
        self.ambient.credential_source().ok_or_else(|| AdapterError::authentication(NO_CREDENTIALS))
    }

    /// Open a connection over an already-built client, without confirming credentials
    pub fn connect_with<C: WarehouseClient>(&self, client: C) -> Result<Connection<C>> {
        let settings = self.resolve()?;
        info!(project = %settings.project, location = %settings.location, "connected to BigQuery");
        Ok(Connection::new(client, settings))
    }

    /// Open a connection over an already-built client once its credentials are accepted
    pub async fn connect_verified<C: WarehouseClient>(&self, client: C) -> Result<Connection<C>> {
        let settings = self.resolve()?;
        open(client, settings).await
    }
}

/// Confirm credentials, then wrap the client
///
/// Only an unauthenticated response fails the connect. Anything else (a missing
/// `bigquery.jobs.create`, a transport hiccup) surfaces on the first query instead.
async fn open<C: WarehouseClient>(client: C, settings: ResolvedConfig) -> Result<Connection<C>> {
    match client.check_credentials(&settings.project, &settings.location).await {
        Ok(()) => {}
        Err(err) if err.is_unauthenticated() => return Err(AdapterError::authentication(err.message)),
        Err(err) => warn!(kind = %err.kind, error = %err, "credential check inconclusive"),
    }

    info!(project = %settings.project, location = %settings.location, "connected to BigQuery");
    Ok(Connection::new(client, settings))
}

impl Adapter for BigQueryAdapter {
    const NAME: &'static str = "bigquery";

    type Client = BigQueryClient;

    async fn connect(&self) -> Result<Connection<BigQueryClient>> {
        let settings = self.resolve()?;
        let source = self.credential_source()?;
        debug!(source = ?source, "using ambient credentials");

        let client = BigQueryClient::from_credentials(&source)
            .await
            .map_err(|e| AdapterError::authentication(e.message))?;

        open(client, settings).await
    }
}
