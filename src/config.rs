//! Configuration for the Search Console weekly report.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Read-only Search Console scope requested for every token.
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";

/// Upper bound the Search Analytics API accepts for `rowLimit`.
const MAX_ROW_LIMIT: u32 = 25_000;

const DEFAULT_SITE_URL: &str = "https://goamatkaa.in/";
const DEFAULT_CREDENTIALS_PATH: &str = "service-account.json";
const DEFAULT_SUBJECT: &str = "admin@yourdomain.com";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE_URL: &str = "https://searchconsole.googleapis.com/webmasters/v3";

/// Report configuration. Every field has a default so an empty `{}` file is valid.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Verified property to query (e.g. "https://example.com/" or "sc-domain:example.com")
    pub site_url: String,

    /// Path to the service account key file
    pub credentials_path: PathBuf,

    /// User impersonated through domain-wide delegation.
    /// Applied whenever present; set to null to query as the service account itself.
    pub delegated_subject: Option<String>,

    /// Length of the reporting window in days, ending today
    pub window_days: u32,

    /// Trailing days used for the top pages / top queries extracts
    pub recency_days: u32,

    /// Maximum rows requested from the API (single page, no pagination)
    pub row_limit: u32,

    /// Number of entries kept in each top-N list
    pub top_n: usize,

    /// HTTP timeout in seconds. None means no client-side timeout.
    pub timeout_seconds: Option<u64>,

    /// OAuth2 token endpoint used when the key file does not name one
    pub token_url: String,

    /// Search Console API base URL
    pub api_base_url: String,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            delegated_subject: Some(DEFAULT_SUBJECT.to_string()),
            window_days: 7,
            recency_days: 3,
            row_limit: 1000,
            top_n: 5,
            timeout_seconds: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            debug: false,
        }
    }
}

impl ReportConfig {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_url.trim().is_empty() {
            return Err(ConfigError::MissingField("site_url".into()));
        }
        if self.credentials_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("credentials_path".into()));
        }
        if let Some(subject) = &self.delegated_subject {
            if subject.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "delegated_subject must not be empty; use null to disable delegation".into(),
                ));
            }
        }
        if self.window_days == 0 {
            return Err(ConfigError::Invalid("window_days must be at least 1".into()));
        }
        if self.recency_days > self.window_days {
            return Err(ConfigError::Invalid(format!(
                "recency_days ({}) must not exceed window_days ({})",
                self.recency_days, self.window_days
            )));
        }
        if self.row_limit == 0 || self.row_limit > MAX_ROW_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "row_limit must be between 1 and {}, got {}",
                MAX_ROW_LIMIT, self.row_limit
            )));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".into()));
        }

        Ok(())
    }

    /// OAuth2 scope requested for the report.
    pub fn scope(&self) -> &'static str {
        READONLY_SCOPE
    }

    /// Get the Search Analytics query URL for the configured property.
    pub fn query_url(&self) -> String {
        format!(
            "{}/sites/{}/searchAnalytics/query",
            self.api_base_url.trim_end_matches('/'),
            urlencoding::encode(&self.site_url)
        )
    }

    /// Get timeout as Duration, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}
