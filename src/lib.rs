//! Search Console weekly report
//!
//! Pulls a week of search analytics for one property and reshapes it into
//! per-date series plus top pages and top queries.

pub mod auth;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod search_analytics;

pub use config::ReportConfig;
pub use error::{ApiError, AuthError, ConfigError, FailureCategory, ReportError};
pub use fetcher::{ReportFetcher, ReportOutcome};
pub use report::{FormattedReport, TopPage, TopQuery};
pub use search_analytics::{QuerySpec, ResultRow, SearchAnalyticsApi, SearchConsoleClient};
