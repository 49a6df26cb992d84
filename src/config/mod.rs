//! Configuration Management
//!
//! This module turns the two adapter options into the settings a connection runs with.
//!
//! # Options
//! - `project` (`-p`): billing/compute project ID. Optional.
//! - `location` (`-l`): region qualifier for jobs and `INFORMATION_SCHEMA`. Defaults to `US`.
//!
//! # Project Resolution Precedence
//! 1. Explicit `project` option (highest priority)
//! 2. `GOOGLE_CLOUD_PROJECT` / `CLOUDSDK_CORE_PROJECT` environment variables
//! 3. The gcloud CLI's active configuration (`[core] project`)
//! 4. `project_id` / `quota_project_id` in the `GOOGLE_APPLICATION_CREDENTIALS` file
//!
//! # Credential Discovery
//! [`AmbientEnvironment::credential_source`] picks where credentials come from, in the
//! order Application Default Credentials uses:
//! 1. The file named by `GOOGLE_APPLICATION_CREDENTIALS`
//! 2. gcloud's `application_default_credentials.json` (`gcloud auth application-default login`)
//! 3. The metadata server, when running on Google Cloud
//!
//! Only the file's `type` is read here. Secrets are loaded by the client library.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{AdapterError, Result};

/// Location used when none is configured
pub const DEFAULT_LOCATION: &str = "US";

/// Well-known ADC file inside the gcloud configuration directory
pub const GCLOUD_ADC_FILE: &str = "application_default_credentials.json";

static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9-]{4,28}[a-z0-9]$").expect("valid regex"));

static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9-]*[a-z0-9]$").expect("valid regex"));

/// Adapter options as supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Project ID (falls back to the ambient default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Region qualifier (falls back to `US`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl AdapterConfig {
    #[must_use]
    pub fn new(project: Option<String>, location: Option<String>) -> Self {
        Self { project, location }
    }

    /// Effective location: the configured value or `US`
    #[must_use]
    pub fn effective_location(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    /// Resolve project and location against the ambient environment
    ///
    /// Validation happens here, before any credential discovery or network call.
    pub fn resolve(&self, ambient: &AmbientEnvironment) -> Result<ResolvedConfig> {
        let project = match self.project.as_deref() {
            Some(project) => project.to_string(),
            None => ambient.default_project().ok_or_else(|| {
                AdapterError::configuration(
                    "No project configured. Pass --project or set a default with \
                     'gcloud config set project <PROJECT_ID>'",
                )
            })?,
        };

        validate_project(&project)?;
        let location = self.effective_location().to_string();
        validate_location(&location)?;

        Ok(ResolvedConfig { project, location })
    }
}

/// Settings a connection runs with after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub project: String,
    pub location: String,
}

/// Validate a project ID
pub fn validate_project(project: &str) -> Result<()> {
    if PROJECT_ID.is_match(project) {
        Ok(())
    } else {
        Err(AdapterError::configuration(format!("Must provide a valid project ID, got '{project}'")))
    }
}

/// Validate a region qualifier (`US`, `EU`, `us-central1`, ...)
pub fn validate_location(location: &str) -> Result<()> {
    if REGION.is_match(location) {
        Ok(())
    } else {
        Err(AdapterError::configuration(format!("Must provide a valid region, got '{location}'")))
    }
}

/// Option descriptor advertised to the host
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdapterOption {
    pub name: &'static str,
    pub description: &'static str,
    pub short_decl: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip)]
    pub validator: fn(&str) -> Result<()>,
}

impl AdapterOption {
    /// Run the option's validator
    pub fn validate(&self, value: &str) -> Result<()> {
        (self.validator)(value)
    }
}

/// Options recognized by the adapter
pub const ADAPTER_OPTIONS: [AdapterOption; 2] = [
    AdapterOption {
        name: "project",
        description: "The project ID to use for the BigQuery connection",
        short_decl: "-p",
        default: None,
        validator: validate_project,
    },
    AdapterOption {
        name: "location",
        description: "The location to use for the BigQuery connection",
        short_decl: "-l",
        default: Some(DEFAULT_LOCATION),
        validator: validate_location,
    },
];

/// Snapshot of the ambient sources a default project can come from
///
/// Built from the process environment in production. Tests construct it directly.
#[derive(Debug, Clone, Default)]
pub struct AmbientEnvironment {
    /// `GOOGLE_CLOUD_PROJECT`, else `CLOUDSDK_CORE_PROJECT`
    pub project_env: Option<String>,

    /// gcloud configuration directory (`$CLOUDSDK_CONFIG` or platform default)
    pub gcloud_config_dir: Option<PathBuf>,

    /// `CLOUDSDK_ACTIVE_CONFIG_NAME`
    pub active_config: Option<String>,

    /// `GOOGLE_APPLICATION_CREDENTIALS`
    pub credentials_file: Option<PathBuf>,

    /// Running on Google Cloud, where the metadata server hands out tokens
    pub metadata_server: bool,
}

/// Where a client's credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Service account key file
    ServiceAccountKey(PathBuf),

    /// `authorized_user` file, as written by `gcloud auth application-default login`
    AuthorizedUser(PathBuf),

    /// GCE/GKE/Cloud Run metadata server
    MetadataServer,
}

impl AmbientEnvironment {
    /// Capture the ambient sources from the running process
    #[must_use]
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            project_env: var("GOOGLE_CLOUD_PROJECT").or_else(|| var("CLOUDSDK_CORE_PROJECT")),
            gcloud_config_dir: var("CLOUDSDK_CONFIG")
                .map(PathBuf::from)
                .or_else(default_gcloud_config_dir),
            active_config: var("CLOUDSDK_ACTIVE_CONFIG_NAME"),
            credentials_file: var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            metadata_server: var("GCE_METADATA_HOST").is_some()
                || var("K_SERVICE").is_some()
                || on_google_compute(),
        }
    }

    /// An environment with no ambient project sources at all
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// First default project found, in precedence order
    #[must_use]
    pub fn default_project(&self) -> Option<String> {
        if let Some(project) = &self.project_env {
            return Some(project.trim().to_string());
        }

        if let Some(dir) = &self.gcloud_config_dir {
            if let Some(project) = gcloud_project(dir, self.active_config.as_deref()) {
                return Some(project);
            }
        }

        self.credentials_file.as_deref().and_then(credentials_project)
    }

    /// First credential source found, in ADC order
    ///
    /// `None` means no ambient credentials are discoverable at all.
    #[must_use]
    pub fn credential_source(&self) -> Option<CredentialSource> {
        if let Some(path) = &self.credentials_file {
            // The library reports unreadable or unsupported files itself
            return Some(match credential_type(path).as_deref() {
                Some("authorized_user") => CredentialSource::AuthorizedUser(path.clone()),
                _ => CredentialSource::ServiceAccountKey(path.clone()),
            });
        }

        if let Some(path) = self.gcloud_config_dir.as_ref().map(|dir| dir.join(GCLOUD_ADC_FILE)) {
            match credential_type(&path).as_deref() {
                Some("authorized_user") => return Some(CredentialSource::AuthorizedUser(path)),
                Some("service_account") => return Some(CredentialSource::ServiceAccountKey(path)),
                _ => {}
            }
        }

        self.metadata_server.then_some(CredentialSource::MetadataServer)
    }
}

/// GCE and GKE nodes report a Google product name
fn on_google_compute() -> bool {
    fs::read_to_string("/sys/class/dmi/id/product_name").is_ok_and(|name| name.trim().starts_with("Google"))
}

/// Platform location of the gcloud configuration directory
fn default_gcloud_config_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        dirs::config_dir().map(|d| d.join("gcloud"))
    } else {
        dirs::home_dir().map(|d| d.join(".config").join("gcloud"))
    }
}

/// Read `[core] project` from the active gcloud configuration
fn gcloud_project(config_dir: &Path, active_config: Option<&str>) -> Option<String> {
    let active = match active_config {
        Some(name) => name.to_string(),
        None => fs::read_to_string(config_dir.join("active_config"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "default".to_string()),
    };

    let path = config_dir.join("configurations").join(format!("config_{active}"));
    let contents = fs::read_to_string(path).ok()?;
    ini_value(&contents, "core", "project")
}

/// Minimal INI lookup for gcloud's properties files
fn ini_value(contents: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;

    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == section;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let value = v.trim();
                return (!value.is_empty()).then(|| value.to_string());
            }
        }
    }

    None
}

fn read_json(path: &Path) -> Option<serde_json::Value> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// `type` of a credentials JSON file (`service_account`, `authorized_user`, ...)
fn credential_type(path: &Path) -> Option<String> {
    read_json(path)?.get("type")?.as_str().map(str::to_string)
}

/// Project named inside an ADC/service-account JSON file
fn credentials_project(path: &Path) -> Option<String> {
    let json = read_json(path)?;

    ["project_id", "quota_project_id"]
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
