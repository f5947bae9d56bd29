//! Report query data models

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Date range of a report, in the reporting API's own notation
/// (`2025-09-01`, `30daysAgo`, `today`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day included
    pub start: String,
    /// Last day included
    pub end: String,
}

impl DateRange {
    /// Create a date range
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// String match type of a dimension filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Exact match
    #[default]
    Exact,
    /// Prefix match
    BeginsWith,
    /// Suffix match
    EndsWith,
    /// Substring match
    Contains,
    /// Whole value matches the regular expression
    FullRegexp,
    /// Part of the value matches the regular expression
    PartialRegexp,
}

/// Restricts a report to rows whose dimension matches a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    /// Dimension the filter applies to
    pub field: String,
    /// How `value` is compared
    #[serde(default)]
    pub match_type: MatchType,
    /// Value to compare against
    pub value: String,
}

/// How a report's rows collapse into a single number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Value at `value_index` of the first row
    #[default]
    FirstRow,
    /// First metric value summed over all rows
    SumRows,
}

/// One analytics query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Metric name this report populates in the snapshot
    pub name: String,

    /// Date range to aggregate over
    pub date_range: DateRange,

    /// Metric names requested from the reporting API
    pub metrics: Vec<String>,

    /// Optional dimension to break rows down by
    #[serde(default)]
    pub dimension: Option<String>,

    /// Optional dimension filter
    #[serde(default)]
    pub filter: Option<DimensionFilter>,

    /// Reduction applied to the returned rows
    #[serde(default)]
    pub reduction: Reduction,

    /// Metric index read by [`Reduction::FirstRow`]
    #[serde(default)]
    pub value_index: usize,
}

impl ReportSpec {
    /// Single-row report of one metric
    pub fn metric(
        name: impl Into<String>,
        metric: impl Into<String>,
        date_range: DateRange,
    ) -> Self {
        Self {
            name: name.into(),
            date_range,
            metrics: vec![metric.into()],
            dimension: None,
            filter: None,
            reduction: Reduction::FirstRow,
            value_index: 0,
        }
    }

    /// Event count summed over every event name matching `filter`
    pub fn event_count(
        name: impl Into<String>,
        date_range: DateRange,
        filter: DimensionFilter,
    ) -> Self {
        Self {
            name: name.into(),
            date_range,
            metrics: vec!["eventCount".to_string()],
            dimension: Some(filter.field.clone()),
            filter: Some(filter),
            reduction: Reduction::SumRows,
            value_index: 0,
        }
    }
}

/// A row of a report response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportRow {
    /// Dimension values, in request order
    pub dimension_values: Vec<String>,
    /// Metric values as returned upstream, in request order
    pub metric_values: Vec<String>,
}

/// Why a report query produced no data
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFailure {
    /// Human-readable reason
    pub message: String,
    /// Upstream error payload, if any
    pub upstream: Option<serde_json::Value>,
    /// Whether the query hit its timeout
    pub timed_out: bool,
}

impl From<Error> for ReportFailure {
    fn from(err: Error) -> Self {
        match err {
            Error::ReportQuery {
                message,
                upstream,
                timed_out,
                ..
            } => Self {
                message,
                upstream,
                timed_out,
            },
            other => Self {
                message: other.to_string(),
                upstream: None,
                timed_out: false,
            },
        }
    }
}

/// Response to one [`ReportSpec`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportResult {
    /// Name of the spec this result answers
    pub report: String,
    /// Returned rows; empty is a valid answer
    pub rows: Vec<ReportRow>,
    /// Set when the query failed
    pub failure: Option<ReportFailure>,
}

impl ReportResult {
    /// Successful result
    pub fn ok(report: impl Into<String>, rows: Vec<ReportRow>) -> Self {
        Self {
            report: report.into(),
            rows,
            failure: None,
        }
    }

    /// Failed result with no rows
    pub fn failed(report: impl Into<String>, failure: impl Into<ReportFailure>) -> Self {
        Self {
            report: report.into(),
            rows: Vec::new(),
            failure: Some(failure.into()),
        }
    }

    /// Whether the query failed
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_count_spec_breaks_down_by_filtered_dimension() {
        let spec = ReportSpec::event_count(
            "downloads",
            DateRange::new("2025-09-01", "today"),
            DimensionFilter {
                field: "eventName".to_string(),
                match_type: MatchType::Exact,
                value: "apk_download".to_string(),
            },
        );

        assert_eq!(spec.dimension.as_deref(), Some("eventName"));
        assert_eq!(spec.metrics, vec!["eventCount"]);
        assert_eq!(spec.reduction, Reduction::SumRows);
    }

    #[test]
    fn failure_from_report_query_error_keeps_detail() {
        let err = Error::ReportQuery {
            report: "downloads".to_string(),
            message: "timed out after 50ms".to_string(),
            upstream: None,
            timed_out: true,
        };
        let result = ReportResult::failed("downloads", err);

        assert!(result.is_failed());
        assert!(result.rows.is_empty());
        let failure = result.failure.unwrap();
        assert!(failure.timed_out);
        assert_eq!(failure.message, "timed out after 50ms");
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: ReportSpec = serde_json::from_value(serde_json::json!({
            "name": "activeUsers",
            "date_range": { "start": "30daysAgo", "end": "today" },
            "metrics": ["activeUsers"]
        }))
        .unwrap();

        assert_eq!(spec, ReportSpec::metric("activeUsers", "activeUsers", DateRange::new("30daysAgo", "today")));
    }
}
