//! Unified error types for the Search Console report.

use reqwest::StatusCode;
use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key file: {0}")]
    KeyFile(#[from] serde_json::Error),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Failed to sign assertion: {0}")]
    Signing(String),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token request failed with status {status}: {body}")]
    TokenRequestFailed { status: StatusCode, body: String },

    #[error("Token parse error: {0}")]
    TokenParse(String),
}

/// API request/response errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("Search Console error [{code}]: {message}")]
    ServiceError {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Malformed row {index}: {reason}")]
    MalformedRow { index: usize, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    HttpClientInit(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::HttpError { status, .. } | ApiError::ServiceError { status, .. } => {
                Some(*status)
            }
            ApiError::Auth(AuthError::TokenRequestFailed { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Broad failure category reported to callers of the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Credentials could not be loaded, signed, exchanged or were refused.
    Authorization,
    /// The request could not be sent or the service answered with an error.
    Network,
    /// The service answered but the payload could not be used.
    MalformedResponse,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureCategory::Authorization => "authorization",
            FailureCategory::Network => "network",
            FailureCategory::MalformedResponse => "malformed response",
        };
        f.write_str(name)
    }
}

/// Failure of a report fetch.
#[derive(Debug, Error)]
#[error("{category} failure: {source}")]
pub struct ReportError {
    category: FailureCategory,
    #[source]
    source: ApiError,
}

impl ReportError {
    pub fn category(&self) -> FailureCategory {
        self.category
    }

    pub fn into_inner(self) -> ApiError {
        self.source
    }
}

impl From<ApiError> for ReportError {
    fn from(source: ApiError) -> Self {
        let category = match &source {
            ApiError::Auth(_) => FailureCategory::Authorization,
            ApiError::HttpError { status, .. } | ApiError::ServiceError { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                FailureCategory::Authorization
            }
            ApiError::Request(_)
            | ApiError::HttpError { .. }
            | ApiError::ServiceError { .. }
            | ApiError::HttpClientInit(_) => FailureCategory::Network,
            ApiError::JsonParse(_) | ApiError::MalformedRow { .. } => {
                FailureCategory::MalformedResponse
            }
        };

        Self { category, source }
    }
}
