//! Reduction of report results into a snapshot

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{
    Diagnostic, DiagnosticKind, MetricValue, MetricsSnapshot, Reduction, ReportResult, ReportSpec,
    SnapshotSource,
};

use super::format::parse_metric;

/// Value at `value_index` of the first row, or `0` when there is none
pub fn extract_metric_value(result: &ReportResult, value_index: usize) -> f64 {
    result
        .rows
        .first()
        .and_then(|row| row.metric_values.get(value_index))
        .map_or(0.0, |raw| parse_metric(raw))
}

/// First metric value summed over every row.
///
/// Used when a dimension filter matches several event names that count as one.
pub fn reduce_event_counts(result: &ReportResult) -> f64 {
    result
        .rows
        .iter()
        .filter_map(|row| row.metric_values.first())
        .map(|raw| parse_metric(raw))
        .sum()
}

/// Collapse a result using the reduction its spec asks for
pub fn reduce(spec: &ReportSpec, result: &ReportResult) -> f64 {
    match spec.reduction {
        Reduction::FirstRow => extract_metric_value(result, spec.value_index),
        Reduction::SumRows => reduce_event_counts(result),
    }
}

/// Merge every report result into one live snapshot.
///
/// `specs` and `results` are paired by position. Failed results contribute a
/// zero, mark the snapshot degraded and add a diagnostic.
pub fn build_snapshot(
    specs: &[ReportSpec],
    results: &[ReportResult],
    timestamp: DateTime<Utc>,
) -> MetricsSnapshot {
    let mut metrics = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for (spec, result) in specs.iter().zip(results) {
        let raw = reduce(spec, result);
        debug!(report = %spec.name, raw, rows = result.rows.len(), "Reduced report");
        metrics.insert(spec.name.clone(), MetricValue::from_raw(raw));

        if let Some(failure) = &result.failure {
            diagnostics.push(Diagnostic {
                kind: DiagnosticKind::ReportQuery,
                report: Some(result.report.clone()),
                message: failure.message.clone(),
                upstream: failure.upstream.clone(),
            });
        }
    }

    MetricsSnapshot {
        metrics,
        timestamp,
        degraded: !diagnostics.is_empty(),
        source: SnapshotSource::Live,
        diagnostics,
    }
}
