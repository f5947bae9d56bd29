//! Static-default snapshots for invocations that cannot reach live data

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::{FallbackConfig, FallbackValue};
use crate::error::Error;
use crate::models::{
    Diagnostic, DiagnosticKind, MetricValue, MetricsSnapshot, ReportSpec, SnapshotSource,
};

/// Builds the snapshot served when credentials, signing, token exchange or
/// every report query fails
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    defaults: BTreeMap<String, FallbackValue>,
}

impl FallbackPolicy {
    /// Create a policy serving `config`'s defaults
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            defaults: config.defaults.clone(),
        }
    }

    /// Snapshot of the configured defaults.
    ///
    /// Every report gets an entry under its own name; reports without a
    /// configured default are zero. Default names match report names
    /// case-insensitively; the config loader lowercases map keys.
    pub fn snapshot(
        &self,
        reports: &[ReportSpec],
        timestamp: DateTime<Utc>,
        diagnostics: Vec<Diagnostic>,
    ) -> MetricsSnapshot {
        let mut metrics: BTreeMap<String, MetricValue> = reports
            .iter()
            .map(|report| {
                let value = self
                    .default_for(&report.name)
                    .map_or_else(|| MetricValue::from_raw(0.0), FallbackValue::to_metric);
                (report.name.clone(), value)
            })
            .collect();

        for (name, value) in &self.defaults {
            if !reports.iter().any(|r| r.name.eq_ignore_ascii_case(name)) {
                metrics
                    .entry(name.clone())
                    .or_insert_with(|| value.to_metric());
            }
        }

        MetricsSnapshot {
            metrics,
            timestamp,
            degraded: true,
            source: SnapshotSource::Fallback,
            diagnostics,
        }
    }

    /// Default configured for `name`, preferring an exact match
    fn default_for(&self, name: &str) -> Option<&FallbackValue> {
        self.defaults.get(name).or_else(|| {
            self.defaults
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Snapshot for an invocation without credentials
    pub fn without_credentials(
        &self,
        reports: &[ReportSpec],
        timestamp: DateTime<Utc>,
    ) -> MetricsSnapshot {
        warn!("No service account credentials configured, serving defaults");
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::Credential,
            report: None,
            message: "no service account credentials configured".to_string(),
            upstream: None,
        };
        self.snapshot(reports, timestamp, vec![diagnostic])
    }

    /// Snapshot for an invocation that failed before any report ran
    pub fn recover(
        &self,
        reports: &[ReportSpec],
        err: &Error,
        timestamp: DateTime<Utc>,
    ) -> MetricsSnapshot {
        warn!(error = %err, "Serving default metrics");
        self.snapshot(reports, timestamp, vec![Diagnostic::from(err)])
    }
}
