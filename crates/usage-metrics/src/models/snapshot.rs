//! Metrics snapshot data models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::format_display_number;
use crate::error::Error;

/// A single metric, formatted for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    /// Abbreviated value shown to visitors (`"1.3k+"`)
    pub display_value: String,
    /// Value the display was derived from
    pub raw_value: i64,
}

impl MetricValue {
    /// Build a metric from its raw value, formatting it for display
    pub fn from_raw(raw: f64) -> Self {
        let raw_value = if raw.is_finite() { raw.trunc() as i64 } else { 0 };
        Self {
            display_value: format_display_number(raw),
            raw_value,
        }
    }

    /// Build a metric with an explicit display string
    pub fn with_display(raw_value: i64, display_value: impl Into<String>) -> Self {
        Self {
            display_value: display_value.into(),
            raw_value,
        }
    }
}

/// Where the snapshot's values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Values were fetched from the reporting API
    Live,
    /// Values are the configured static defaults
    Fallback,
}

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Credentials were missing or unusable
    Credential,
    /// Token exchange failed
    Auth,
    /// One report query failed
    ReportQuery,
}

/// Error detail attached to a degraded snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category
    pub kind: DiagnosticKind,
    /// Report the diagnostic belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Human-readable reason
    pub message: String,
    /// Upstream error payload, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<serde_json::Value>,
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        match err {
            Error::Auth {
                message, upstream, ..
            } => Self {
                kind: DiagnosticKind::Auth,
                report: None,
                message: message.clone(),
                upstream: upstream.clone(),
            },
            Error::ReportQuery {
                report,
                message,
                upstream,
                ..
            } => Self {
                kind: DiagnosticKind::ReportQuery,
                report: Some(report.clone()),
                message: message.clone(),
                upstream: upstream.clone(),
            },
            // Anything else surfaces while loading or parsing credentials
            other => Self {
                kind: DiagnosticKind::Credential,
                report: None,
                message: other.to_string(),
                upstream: None,
            },
        }
    }
}

/// Aggregated, formatted metrics returned by every invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Metric name to value
    pub metrics: BTreeMap<String, MetricValue>,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Whether any value was substituted because a source failed
    pub degraded: bool,

    /// Origin of the values
    pub source: SnapshotSource,

    /// Error details for degraded snapshots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl MetricsSnapshot {
    /// Look up a metric by name
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn serializes_in_wire_shape() {
        let mut metrics = BTreeMap::new();
        metrics.insert("activeUsers".to_string(), MetricValue::from_raw(850.0));
        let snapshot = MetricsSnapshot {
            metrics,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            degraded: false,
            source: SnapshotSource::Live,
            diagnostics: vec![],
        };

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({
                "metrics": { "activeUsers": { "displayValue": "850+", "rawValue": 850 } },
                "timestamp": "2026-10-19T12:00:00Z",
                "degraded": false,
                "source": "live"
            })
        );
    }

    #[test]
    fn metric_from_non_finite_raw_is_zero() {
        assert_eq!(MetricValue::from_raw(f64::NAN), MetricValue::with_display(0, "0+"));
    }

    #[test]
    fn auth_error_becomes_auth_diagnostic() {
        let err = Error::Auth {
            message: "token endpoint returned 401 Unauthorized".to_string(),
            status: Some(401),
            upstream: Some(json!({ "error": "invalid_grant" })),
        };
        let diagnostic = Diagnostic::from(&err);

        assert_eq!(diagnostic.kind, DiagnosticKind::Auth);
        assert_eq!(diagnostic.upstream, Some(json!({ "error": "invalid_grant" })));
        assert!(diagnostic.report.is_none());
    }
}
