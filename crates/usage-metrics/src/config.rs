//! Configuration management for usage-metrics
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! TOML/YAML/JSON file, then `USAGE_METRICS_*` environment variables with `__`
//! separating nested keys (`USAGE_METRICS_ANALYTICS__PROPERTY_ID`).

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{TokenRequestEncoding, ANALYTICS_READONLY_SCOPE, DEFAULT_ASSERTION_TTL};
use crate::error::{Error, Result};
use crate::models::{DateRange, DimensionFilter, MatchType, MetricValue, ReportSpec};
use crate::reports::DEFAULT_REPORTING_ENDPOINT;

/// Prefix of environment variables read by [`Config::load`]
pub const ENV_PREFIX: &str = "USAGE_METRICS";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Reporting API configuration
    pub analytics: AnalyticsConfig,

    /// Where service-account credentials are read from
    pub credentials: CredentialsConfig,

    /// Values served when live data is unavailable
    pub fallback: FallbackConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and validate configuration from defaults, `path` and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a live snapshot
    pub fn validate(&self) -> Result<()> {
        self.analytics.validate()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// `max-age` of live responses, in seconds
    pub cache_max_age_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            cache_max_age_secs: 3600,
        }
    }
}

/// Reporting API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Analytics property queried by every report
    pub property_id: String,

    /// Root of the reporting API
    pub reporting_endpoint: String,

    /// OAuth2 scope requested in the assertion
    pub scope: String,

    /// Assertion audience; the credentials' token endpoint when unset
    pub audience: Option<String>,

    /// Lifetime of signed assertions
    #[serde(with = "humantime_serde")]
    pub assertion_ttl: Duration,

    /// Timeout of the token exchange request
    #[serde(with = "humantime_serde")]
    pub token_timeout: Duration,

    /// Timeout of each report query
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,

    /// Body encoding of the token request
    pub token_request_encoding: TokenRequestEncoding,

    /// Reports fetched on every invocation
    pub reports: Vec<ReportSpec>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            property_id: String::new(),
            reporting_endpoint: DEFAULT_REPORTING_ENDPOINT.to_string(),
            scope: ANALYTICS_READONLY_SCOPE.to_string(),
            audience: None,
            assertion_ttl: DEFAULT_ASSERTION_TTL,
            token_timeout: Duration::from_secs(10),
            query_timeout: Duration::from_secs(10),
            token_request_encoding: TokenRequestEncoding::default(),
            reports: default_reports(),
        }
    }
}

impl AnalyticsConfig {
    fn validate(&self) -> Result<()> {
        if self.property_id.trim().is_empty() {
            return Err(Error::config("analytics.property_id is required"));
        }
        Url::parse(&self.reporting_endpoint).map_err(|e| {
            Error::config(format!("analytics.reporting_endpoint is not a valid URL: {e}"))
        })?;
        if self.query_timeout.is_zero() || self.token_timeout.is_zero() {
            return Err(Error::config("analytics timeouts must be non-zero"));
        }
        if self.reports.is_empty() {
            return Err(Error::config("analytics.reports must list at least one report"));
        }

        let mut seen = HashSet::new();
        for report in &self.reports {
            if report.name.trim().is_empty() {
                return Err(Error::config("every report needs a name"));
            }
            if !seen.insert(report.name.as_str()) {
                return Err(Error::config(format!("duplicate report name '{}'", report.name)));
            }
            if report.metrics.is_empty() {
                return Err(Error::config(format!(
                    "report '{}' requests no metrics",
                    report.name
                )));
            }
        }
        Ok(())
    }
}

/// Reports served by default: active users over the last 30 days and APK
/// downloads since launch.
///
/// A `sessions` report is a common stand-in for downloads on properties that
/// do not emit download events; add it to `analytics.reports` to serve it.
pub fn default_reports() -> Vec<ReportSpec> {
    vec![
        ReportSpec::metric(
            "activeUsers",
            "activeUsers",
            DateRange::new("30daysAgo", "today"),
        ),
        ReportSpec::event_count(
            "downloads",
            DateRange::new("2025-09-01", "today"),
            DimensionFilter {
                field: "eventName".to_string(),
                match_type: MatchType::Exact,
                value: "apk_download".to_string(),
            },
        ),
    ]
}

/// Where service-account credentials are read from, per invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable holding the service-account JSON
    pub env_var: String,
    /// JSON key file; takes precedence over `env_var` when set
    pub file: Option<PathBuf>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: "GA4_CREDENTIALS".to_string(),
            file: None,
        }
    }
}

/// A static value served in place of live data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackValue {
    /// Raw value
    pub raw: i64,
    /// Display string; derived from `raw` when unset
    #[serde(default)]
    pub display: Option<String>,
}

impl FallbackValue {
    /// The value as a snapshot metric
    pub fn to_metric(&self) -> MetricValue {
        match &self.display {
            Some(display) => MetricValue::with_display(self.raw, display.clone()),
            None => MetricValue::from_raw(self.raw as f64),
        }
    }
}

/// Values served when live data is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Metric name to default value
    pub defaults: BTreeMap<String, FallbackValue>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert(
            "downloads".to_string(),
            FallbackValue {
                raw: 1200,
                display: Some("1,200+".to_string()),
            },
        );
        defaults.insert(
            "activeUsers".to_string(),
            FallbackValue {
                raw: 850,
                display: None,
            },
        );
        Self { defaults }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
