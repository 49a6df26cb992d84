//! Error Handling Infrastructure
//!
//! This module defines the error taxonomy surfaced to the IDE host.
//! Every failure from the BigQuery client library is wrapped minimally, keeping the
//! native message, and mapped to a stable error code for JSON output.
//!
//! # Error Categories
//! - `ConfigurationError`: Project could not be resolved, or an option is invalid
//! - `AuthenticationError`: No ambient credentials could be discovered
//! - `PermissionError`: A metadata query was denied by IAM
//! - `QueryError`: Any execution failure, including malformed SQL
//! - `InvalidInput`: Malformed CLI input

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// System view addressed by a metadata query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataView {
    /// `INFORMATION_SCHEMA.TABLES` (combined with `ROUTINES`)
    Tables,
    /// `INFORMATION_SCHEMA.COLUMNS`
    Columns,
}

impl MetadataView {
    /// View name as it appears in SQL
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tables => "TABLES",
            Self::Columns => "COLUMNS",
        }
    }
}

impl fmt::Display for MetadataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for adapter operations
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Project could not be resolved, or an option failed validation
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No ambient credentials were discoverable
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Metadata query rejected by IAM
    #[error("Permission denied on INFORMATION_SCHEMA.{view}{}: {message}", missing_suffix(.missing_permission))]
    PermissionError {
        view: MetadataView,
        missing_permission: Option<String>,
        message: String,
    },

    /// Query execution failed
    #[error("Query error: {0}")]
    QueryError(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

fn missing_suffix(missing: &Option<String>) -> String {
    missing.as_ref().map(|p| format!(" (missing {p})")).unwrap_or_default()
}

impl AdapterError {
    /// Stable error code for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigurationError(_) => "CONFIGURATION_ERROR",
            Self::AuthenticationError(_) => "AUTHENTICATION_ERROR",
            Self::PermissionError { .. } => "PERMISSION_ERROR",
            Self::QueryError(_) => "QUERY_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// Human-readable error message
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationError(message.into())
    }

    pub fn permission(
        view: MetadataView,
        missing_permission: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PermissionError { view, missing_permission, message: message.into() }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryError(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;
