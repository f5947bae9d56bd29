//! Concurrent report queries

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::auth::{upstream_payload, AccessToken};
use crate::error::{Error, Result};
use crate::models::{ReportResult, ReportRow, ReportSpec};

use super::wire::{RunReportRequest, RunReportResponse};

/// Reporting API root used when none is configured
pub const DEFAULT_REPORTING_ENDPOINT: &str = "https://analyticsdata.googleapis.com/v1beta";

/// Issues report queries for one property
#[derive(Debug, Clone)]
pub struct ReportFetcher {
    client: Client,
    run_report_url: String,
    timeout: Duration,
}

impl ReportFetcher {
    /// Create a fetcher for `property_id` under the reporting API root `endpoint`
    pub fn new(client: Client, endpoint: &str, property_id: &str, timeout: Duration) -> Self {
        let run_report_url = format!(
            "{}/properties/{}:runReport",
            endpoint.trim_end_matches('/'),
            property_id
        );
        Self {
            client,
            run_report_url,
            timeout,
        }
    }

    /// Run every spec concurrently.
    ///
    /// Returns one result per spec, in input order. A failing or timed-out
    /// query yields a failed result and never affects its siblings.
    pub async fn fetch_reports(
        &self,
        token: &AccessToken,
        specs: &[ReportSpec],
    ) -> Vec<ReportResult> {
        debug!(count = specs.len(), "Fetching reports");
        join_all(specs.iter().map(|spec| self.fetch_one(token, spec))).await
    }

    async fn fetch_one(&self, token: &AccessToken, spec: &ReportSpec) -> ReportResult {
        let outcome = match tokio::time::timeout(self.timeout, self.run_report(token, spec)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::ReportQuery {
                report: spec.name.clone(),
                message: format!("timed out after {}ms", self.timeout.as_millis()),
                upstream: None,
                timed_out: true,
            }),
        };

        match outcome {
            Ok(rows) => {
                debug!(report = %spec.name, rows = rows.len(), "Report fetched");
                ReportResult::ok(&spec.name, rows)
            }
            Err(e) => {
                warn!(report = %spec.name, error = %e, "Report query failed");
                ReportResult::failed(&spec.name, e)
            }
        }
    }

    async fn run_report(&self, token: &AccessToken, spec: &ReportSpec) -> Result<Vec<ReportRow>> {
        let failed = |message: String, upstream| Error::ReportQuery {
            report: spec.name.clone(),
            message,
            upstream,
            timed_out: false,
        };

        let response = self
            .client
            .post(&self.run_report_url)
            .bearer_auth(token.secret())
            .json(&RunReportRequest::from(spec))
            .send()
            .await
            .map_err(|e| failed(format!("reporting API unreachable: {e}"), None))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| failed(format!("failed to read report response: {e}"), None))?;

        if !status.is_success() {
            return Err(failed(
                format!("reporting API returned {status}"),
                upstream_payload(&text),
            ));
        }

        let parsed: RunReportResponse = serde_json::from_str(&text).map_err(|e| {
            failed(
                format!("report response is not valid JSON: {e}"),
                upstream_payload(&text),
            )
        })?;

        if let Some(error) = parsed.error {
            return Err(failed("report response carries an error".to_string(), Some(error)));
        }

        Ok(parsed.rows.into_iter().map(ReportRow::from).collect())
    }
}
