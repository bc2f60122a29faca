//! Search Analytics query types and HTTP client.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::ServiceAccountCredentials;
use crate::config::ReportConfig;
use crate::error::{ApiError, AuthError};

/// Grouping key requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Date,
    Page,
    Query,
}

/// Whether unfinalized data is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataState {
    /// Include fresh data that may still change.
    All,
    /// Finalized data only.
    Final,
}

/// Row keys are read positionally in this order.
pub const REPORT_DIMENSIONS: [Dimension; 3] = [Dimension::Date, Dimension::Page, Dimension::Query];

/// Body of a `searchAnalytics.query` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    #[serde(with = "iso_date")]
    pub end_date: NaiveDate,
    pub dimensions: Vec<Dimension>,
    pub row_limit: u32,
    pub data_state: DataState,
}

impl QuerySpec {
    /// Query for the `days` days before `end_date`, grouped by date, page and query.
    pub fn last_days(end_date: NaiveDate, days: u32, row_limit: u32) -> Self {
        Self {
            start_date: end_date - Duration::days(i64::from(days)),
            end_date,
            dimensions: REPORT_DIMENSIONS.to_vec(),
            row_limit,
            data_state: DataState::All,
        }
    }
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format("%Y-%m-%d"))
    }
}

/// One row of the query response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResultRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(deserialize_with = "count_from_number")]
    pub clicks: u64,
    #[serde(deserialize_with = "count_from_number")]
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl ResultRow {
    pub fn date(&self) -> Option<&str> {
        self.keys.first().map(String::as_str)
    }

    pub fn page(&self) -> Option<&str> {
        self.keys.get(1).map(String::as_str)
    }

    pub fn query(&self) -> Option<&str> {
        self.keys.get(2).map(String::as_str)
    }
}

/// Clicks and impressions arrive as JSON doubles.
fn count_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole count, got {}",
            value
        )));
    }
    Ok(value as u64)
}

/// Response of a `searchAnalytics.query` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Absent when the property has no data for the period.
    #[serde(default)]
    pub rows: Option<Vec<ResultRow>>,
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
struct ServiceErrorResponse {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    #[allow(dead_code)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Executes search analytics queries against a property.
#[async_trait]
pub trait SearchAnalyticsApi: Send + Sync {
    async fn query(&self, site_url: &str, query: &QuerySpec) -> Result<QueryResponse, ApiError>;
}

/// HTTP client for the Search Console API.
///
/// Credentials are loaded and exchanged on every query; nothing is cached
/// between calls.
#[derive(Clone)]
pub struct SearchConsoleClient {
    config: ReportConfig,
    http_client: Client,
}

impl SearchConsoleClient {
    /// Create a new client.
    pub fn new(config: ReportConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ApiError::HttpClientInit(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Load the key file and bind the delegated subject, if configured.
    fn credentials(&self) -> Result<ServiceAccountCredentials, AuthError> {
        let credentials = ServiceAccountCredentials::from_file(
            &self.config.credentials_path,
            self.config.scope(),
        )?;

        Ok(match self.config.delegated_subject {
            Some(ref subject) => credentials.with_subject(subject),
            None => credentials,
        })
    }

    fn query_url(&self, site_url: &str) -> String {
        if site_url == self.config.site_url {
            self.config.query_url()
        } else {
            ReportConfig {
                site_url: site_url.to_string(),
                ..self.config.clone()
            }
            .query_url()
        }
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<QueryResponse, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            tracing::debug!(body = %truncate(&body, 500), "Search Analytics response");
            Ok(serde_json::from_str(&body)?)
        } else {
            tracing::debug!(
                %status,
                body = %truncate(&body, 500),
                "Search Analytics error response"
            );
            Err(parse_error_response(status, &body))
        }
    }
}

#[async_trait]
impl SearchAnalyticsApi for SearchConsoleClient {
    async fn query(&self, site_url: &str, query: &QuerySpec) -> Result<QueryResponse, ApiError> {
        let credentials = self.credentials()?;
        let token = credentials
            .fetch_token(&self.http_client, &self.config.token_url)
            .await?;

        let url = self.query_url(site_url);
        tracing::debug!(
            url = %url,
            start = %query.start_date,
            end = %query.end_date,
            "Search Analytics POST request"
        );

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", token.bearer())
            .header("Accept", "application/json")
            .json(query)
            .send()
            .await?;

        self.handle_response(response).await
    }
}

impl std::fmt::Debug for SearchConsoleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConsoleClient")
            .field("site_url", &self.config.site_url)
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

/// Parse error response.
fn parse_error_response(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ServiceErrorResponse>(body) {
        Ok(error) => ApiError::ServiceError {
            status,
            code: error
                .error
                .status
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: error.error.message,
        },
        Err(_) => ApiError::HttpError {
            status,
            body: body.to_string(),
        },
    }
}

fn truncate(body: &str, max_len: usize) -> String {
    match body.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...(truncated)", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_spec_body() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let spec = QuerySpec::last_days(end, 7, 1000);

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "startDate": "2024-01-01",
                "endDate": "2024-01-08",
                "dimensions": ["date", "page", "query"],
                "rowLimit": 1000,
                "dataState": "all"
            })
        );
    }

    #[test]
    fn test_query_spec_crosses_month_boundary() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let spec = QuerySpec::last_days(end, 7, 10);
        assert_eq!(spec.start_date, NaiveDate::from_ymd_opt(2024, 2, 24).unwrap());
    }

    #[test]
    fn test_response_without_rows() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"responseAggregationType": "byPage"}"#).unwrap();
        assert!(response.rows.is_none());
        assert_eq!(response.response_aggregation_type.as_deref(), Some("byPage"));

        let response: QueryResponse = serde_json::from_str(r#"{"rows": null}"#).unwrap();
        assert!(response.rows.is_none());
    }

    #[test]
    fn test_response_with_empty_rows() {
        let response: QueryResponse = serde_json::from_str(r#"{"rows": []}"#).unwrap();
        assert_eq!(response.rows, Some(vec![]));
    }

    #[test]
    fn test_row_counts_accept_doubles() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"rows": [{"keys": ["2024-01-01", "/a", "shoes"], "clicks": 10.0, "impressions": 100, "ctr": 0.1, "position": 3.0}]}"#,
        )
        .unwrap();
        let rows = response.rows.unwrap();

        assert_eq!(rows[0].clicks, 10);
        assert_eq!(rows[0].impressions, 100);
        assert_eq!(rows[0].date(), Some("2024-01-01"));
        assert_eq!(rows[0].page(), Some("/a"));
        assert_eq!(rows[0].query(), Some("shoes"));
    }

    #[test]
    fn test_row_counts_reject_fractions() {
        let result = serde_json::from_str::<ResultRow>(
            r#"{"keys": [], "clicks": 1.5, "impressions": 2, "ctr": 0.1, "position": 1.0}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_service_error() {
        let body = r#"{"error": {"code": 403, "message": "User does not have sufficient permission for site", "status": "PERMISSION_DENIED"}}"#;
        match parse_error_response(StatusCode::FORBIDDEN, body) {
            ApiError::ServiceError { status, code, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(code, "PERMISSION_DENIED");
                assert!(message.contains("sufficient permission"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_error() {
        let error = parse_error_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(
            error,
            ApiError::HttpError { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...(truncated)");
    }

    #[test]
    fn test_client_url_for_other_property() {
        let client = SearchConsoleClient::new(ReportConfig::default()).unwrap();
        assert_eq!(client.query_url("https://goamatkaa.in/"), ReportConfig::default().query_url());
        assert!(client
            .query_url("sc-domain:example.com")
            .ends_with("/sites/sc-domain%3Aexample.com/searchAnalytics/query"));
    }

    #[tokio::test]
    async fn test_missing_key_file_fails_before_network() {
        let config = ReportConfig {
            credentials_path: "/nonexistent/service-account.json".into(),
            api_base_url: "http://127.0.0.1:9".to_string(),
            ..ReportConfig::default()
        };
        let client = SearchConsoleClient::new(config).unwrap();
        let spec = QuerySpec::last_days(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(), 7, 1000);

        let err = client.query("https://goamatkaa.in/", &spec).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Io(_))));
    }
}
