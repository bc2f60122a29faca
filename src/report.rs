//! Reshapes Search Analytics rows into chart-ready series.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::search_analytics::{ResultRow, REPORT_DIMENSIONS};

/// Running totals for one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateAggregate {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr_sum: f64,
    pub position_sum: f64,
    pub count: u32,
}

impl DateAggregate {
    fn add(&mut self, row: &ResultRow) {
        self.clicks += row.clicks;
        self.impressions += row.impressions;
        self.ctr_sum += row.ctr;
        self.position_sum += row.position;
        self.count += 1;
    }

    /// Mean CTR as a percentage, one decimal.
    pub fn ctr_percent(&self) -> f64 {
        round_one_decimal(self.ctr_sum / f64::from(self.count) * 100.0)
    }

    /// Mean position, one decimal.
    pub fn mean_position(&self) -> f64 {
        round_one_decimal(self.position_sum / f64::from(self.count))
    }
}

/// Page entry of the top pages extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPage {
    pub url: String,
    pub clicks: u64,
}

/// Query entry of the top queries extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopQuery {
    pub query: String,
    pub impressions: u64,
}

/// Per-date series plus top-N extracts.
///
/// `dates`, `clicks`, `impressions`, `ctr` and `position` are parallel: index
/// `i` of each describes the same date. Dates appear in the order they were
/// first seen in the response, which is not necessarily calendar order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedReport {
    pub dates: Vec<String>,
    pub clicks: Vec<u64>,
    pub impressions: Vec<u64>,
    pub ctr: Vec<f64>,
    pub position: Vec<f64>,
    pub top_pages: Vec<TopPage>,
    pub top_queries: Vec<TopQuery>,
}

impl FormattedReport {
    /// Number of distinct dates in the series.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Build the report from the rows of a `[date, page, query]` query.
///
/// Top pages and queries are drawn from rows dated on or after
/// `end_date - recency_days`.
pub fn format_report(
    rows: &[ResultRow],
    end_date: NaiveDate,
    recency_days: u32,
    top_n: usize,
) -> Result<FormattedReport, ApiError> {
    check_rows(rows)?;

    let mut report = FormattedReport::default();
    for (date, aggregate) in aggregate_by_date(rows) {
        report.dates.push(date.to_string());
        report.clicks.push(aggregate.clicks);
        report.impressions.push(aggregate.impressions);
        report.ctr.push(aggregate.ctr_percent());
        report.position.push(aggregate.mean_position());
    }

    let recent = recent_rows(rows, end_date, recency_days);

    report.top_pages = top_by(&recent, top_n, |row| row.clicks)
        .map(|row| TopPage {
            url: row.page().unwrap_or_default().to_string(),
            clicks: row.clicks,
        })
        .collect();

    report.top_queries = top_by(&recent, top_n, |row| row.impressions)
        .map(|row| TopQuery {
            query: row.query().unwrap_or_default().to_string(),
            impressions: row.impressions,
        })
        .collect();

    Ok(report)
}

fn check_rows(rows: &[ResultRow]) -> Result<(), ApiError> {
    for (index, row) in rows.iter().enumerate() {
        if row.keys.len() < REPORT_DIMENSIONS.len() {
            return Err(ApiError::MalformedRow {
                index,
                reason: format!(
                    "expected {} keys, got {}",
                    REPORT_DIMENSIONS.len(),
                    row.keys.len()
                ),
            });
        }
    }
    Ok(())
}

/// Sum metrics per date, preserving first-seen date order.
/// Callers run `check_rows` first.
fn aggregate_by_date(rows: &[ResultRow]) -> Vec<(&str, DateAggregate)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut aggregates: Vec<(&str, DateAggregate)> = Vec::new();

    for row in rows {
        let Some(date) = row.date() else {
            continue;
        };
        let idx = *positions.entry(date).or_insert_with(|| {
            aggregates.push((date, DateAggregate::default()));
            aggregates.len() - 1
        });
        aggregates[idx].1.add(row);
    }

    aggregates
}

/// Rows whose date key is lexically >= `end_date - recency_days`.
/// Keys are zero-padded ISO dates, so string order is calendar order.
fn recent_rows(rows: &[ResultRow], end_date: NaiveDate, recency_days: u32) -> Vec<&ResultRow> {
    let cutoff = (end_date - Duration::days(i64::from(recency_days)))
        .format("%Y-%m-%d")
        .to_string();

    rows.iter()
        .filter(|row| row.date().is_some_and(|date| date >= cutoff.as_str()))
        .collect()
}

/// Stable descending sort on `metric`, first `n` rows.
fn top_by<'a, F>(
    rows: &[&'a ResultRow],
    n: usize,
    metric: F,
) -> impl Iterator<Item = &'a ResultRow>
where
    F: Fn(&ResultRow) -> u64,
{
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| metric(b).cmp(&metric(a)));
    sorted.into_iter().take(n)
}

/// Round to one decimal place on the exact binary value, so 4.35
/// (stored as 4.3499...) becomes 4.3.
fn round_one_decimal(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}
