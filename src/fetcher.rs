//! Weekly report fetch: authorize, query once, reshape.

use chrono::{NaiveDate, Utc};

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::{format_report, FormattedReport};
use crate::search_analytics::{QuerySpec, SearchAnalyticsApi};

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Report(FormattedReport),
    /// The response carried no `rows` field.
    NoData,
}

impl ReportOutcome {
    pub fn into_report(self) -> Option<FormattedReport> {
        match self {
            ReportOutcome::Report(report) => Some(report),
            ReportOutcome::NoData => None,
        }
    }
}

/// Fetches the weekly Search Console report for one property.
pub struct ReportFetcher<A> {
    config: ReportConfig,
    api: A,
}

impl<A: SearchAnalyticsApi> ReportFetcher<A> {
    pub fn new(config: ReportConfig, api: A) -> Self {
        Self { config, api }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Fetch the report for the window ending today (UTC calendar date).
    pub async fn fetch_weekly_report(&self) -> Result<ReportOutcome, ReportError> {
        self.fetch_report_ending(Utc::now().date_naive()).await
    }

    /// Fetch the report for the window ending on `end_date`.
    pub async fn fetch_report_ending(
        &self,
        end_date: NaiveDate,
    ) -> Result<ReportOutcome, ReportError> {
        let query = QuerySpec::last_days(end_date, self.config.window_days, self.config.row_limit);

        tracing::debug!(
            site_url = %self.config.site_url,
            start = %query.start_date,
            end = %query.end_date,
            row_limit = query.row_limit,
            "Querying search analytics"
        );

        let response = self.api.query(&self.config.site_url, &query).await?;

        let Some(rows) = response.rows else {
            tracing::info!(site_url = %self.config.site_url, "No search analytics rows for period");
            return Ok(ReportOutcome::NoData);
        };

        if rows.len() >= self.config.row_limit as usize {
            tracing::debug!(
                rows = rows.len(),
                "Row limit reached; additional rows were not returned"
            );
        }

        let report = format_report(&rows, end_date, self.config.recency_days, self.config.top_n)?;

        tracing::info!(
            rows = rows.len(),
            dates = report.len(),
            top_pages = report.top_pages.len(),
            top_queries = report.top_queries.len(),
            "Search analytics report ready"
        );

        Ok(ReportOutcome::Report(report))
    }

    /// Fetch the weekly report, collapsing every failure into `None`.
    ///
    /// Failures are logged; callers cannot tell them apart from an empty period.
    pub async fn fetch_weekly_report_or_none(&self) -> Option<FormattedReport> {
        match self.fetch_weekly_report().await {
            Ok(outcome) => outcome.into_report(),
            Err(e) => {
                tracing::error!(category = %e.category(), "Search Console API error: {}", e);
                None
            }
        }
    }
}

impl<A> std::fmt::Debug for ReportFetcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportFetcher")
            .field("site_url", &self.config.site_url)
            .field("window_days", &self.config.window_days)
            .finish()
    }
}
