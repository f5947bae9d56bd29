//! Collector module - one metrics invocation end to end
//!
//! An invocation loads credentials, signs an assertion, exchanges it for an
//! access token, runs every report concurrently with that token and reduces
//! the results. Whatever fails along the way, the caller gets a snapshot.

mod fallback;
mod source;

pub use fallback::FallbackPolicy;
pub use source::{CredentialSource, EnvCredentials, FileCredentials};

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::aggregation::build_snapshot;
use crate::auth::{build_assertion, TokenExchanger};
use crate::config::{AnalyticsConfig, FallbackConfig};
use crate::error::{Error, Result};
use crate::models::{MetricsSnapshot, ReportResult, ReportSpec, ServiceAccountCredentials};
use crate::reports::ReportFetcher;

/// Produces a [`MetricsSnapshot`] per invocation.
///
/// Holds configuration and a pooled HTTP client only; tokens and credentials
/// live for a single [`collect`](Self::collect) call.
pub struct MetricsCollector {
    reports: Vec<ReportSpec>,
    scope: String,
    audience: Option<String>,
    assertion_ttl: Duration,
    exchanger: TokenExchanger,
    fetcher: ReportFetcher,
    fallback: FallbackPolicy,
}

impl MetricsCollector {
    /// Create a collector with its own HTTP client
    pub fn new(analytics: &AnalyticsConfig, fallback: &FallbackConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("usage-metrics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, analytics, fallback))
    }

    /// Create a collector on top of an existing HTTP client
    pub fn with_client(
        client: Client,
        analytics: &AnalyticsConfig,
        fallback: &FallbackConfig,
    ) -> Self {
        Self {
            reports: analytics.reports.clone(),
            scope: analytics.scope.clone(),
            audience: analytics.audience.clone(),
            assertion_ttl: analytics.assertion_ttl,
            exchanger: TokenExchanger::new(
                client.clone(),
                analytics.token_request_encoding,
                analytics.token_timeout,
            ),
            fetcher: ReportFetcher::new(
                client,
                &analytics.reporting_endpoint,
                &analytics.property_id,
                analytics.query_timeout,
            ),
            fallback: FallbackPolicy::new(fallback),
        }
    }

    /// Reports fetched by every invocation
    pub fn reports(&self) -> &[ReportSpec] {
        &self.reports
    }

    /// Run one invocation. Never fails: problems degrade the snapshot instead.
    #[instrument(skip_all)]
    pub async fn collect(&self, source: &dyn CredentialSource) -> MetricsSnapshot {
        let started = Utc::now();

        let credentials = match source.load().await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return self.fallback.without_credentials(&self.reports, started),
            Err(e) => return self.fallback.recover(&self.reports, &e, started),
        };

        match self.collect_live(&credentials).await {
            Ok(snapshot) => {
                info!(
                    degraded = snapshot.degraded,
                    metrics = snapshot.metrics.len(),
                    "Collected metrics"
                );
                snapshot
            }
            Err(e) => self.fallback.recover(&self.reports, &e, started),
        }
    }

    async fn collect_live(&self, credentials: &ServiceAccountCredentials) -> Result<MetricsSnapshot> {
        let audience = self
            .audience
            .as_deref()
            .unwrap_or(&credentials.token_endpoint);

        let assertion = build_assertion(
            credentials,
            &self.scope,
            audience,
            Utc::now(),
            self.assertion_ttl,
        )?;
        let token = self
            .exchanger
            .exchange(&assertion, &credentials.token_endpoint)
            .await?;

        let results = self.fetcher.fetch_reports(&token, &self.reports).await;
        let snapshot = build_snapshot(&self.reports, &results, Utc::now());

        if !results.is_empty() && results.iter().all(ReportResult::is_failed) {
            warn!("Every report query failed, serving defaults");
            return Ok(self
                .fallback
                .snapshot(&self.reports, snapshot.timestamp, snapshot.diagnostics));
        }

        Ok(snapshot)
    }
}
