//! bigquery-adapter - BigQuery for terminal SQL IDEs
//!
//! A thin adapter between an IDE's plugin host and BigQuery. It connects with ambient
//! Google Cloud credentials, executes SQL verbatim, and loads the project's catalog
//! (datasets, tables, routines, columns) from two `INFORMATION_SCHEMA` queries.
//!
//! # Core Principles
//! - Pass-through: SQL and rows are not parsed or transformed
//! - Ambient auth: no credential material is accepted or stored
//! - No recovery: every client failure is wrapped once and returned
//!
//! # Module Organization
//! - [`error`] - Error taxonomy and codes
//! - [`config`] - Options, validation, ambient project discovery
//! - [`client`] - Warehouse client seam (BigQuery and in-memory mock)
//! - [`adapter`] - Host contract, connection, row cursor
//! - [`catalog`] - Metadata queries and catalog tree
//! - [`types`] - Short type labels
//! - [`completion`] - Static editor completions
//! - [`output`] - JSON output envelopes

pub mod adapter;
pub mod catalog;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod output;
pub mod types;

pub use adapter::bigquery::BigQueryAdapter;
pub use adapter::{Adapter, Connection, ResultColumn, RowStream};
pub use catalog::{Catalog, CatalogItem, CatalogTree};
pub use client::{WarehouseClient, WarehouseError, WarehouseErrorKind};
pub use completion::Completion;
pub use config::{AdapterConfig, AmbientEnvironment, CredentialSource, ResolvedConfig, ADAPTER_OPTIONS};
pub use error::{AdapterError, MetadataView, Result};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
