//! # Usage Metrics
//!
//! Public usage counters for a web or app property, read from the analytics
//! reporting API.
//!
//! Each invocation authenticates as a service account with a signed RS256
//! assertion, exchanges it for a short-lived access token, runs every
//! configured report concurrently, and reduces the results to abbreviated
//! display values (`"1.3k+"`). When credentials or upstream calls fail, the
//! invocation still answers with configured defaults and marks the snapshot
//! degraded.
//!
//! ## Architecture
//!
//! - **Auth**: assertion signing and the JWT-bearer token exchange
//! - **Reports**: concurrent report queries with per-query timeouts
//! - **Aggregation**: reduction of report rows and display formatting
//! - **Collector**: one invocation end to end, including the fallback policy
//! - **API**: HTTP endpoint serving snapshots
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve snapshots over HTTP
//! usage-metrics serve
//!
//! # Print one snapshot
//! usage-metrics fetch --pretty
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregation;
pub mod api;
pub mod auth;
pub mod collector;
pub mod config;
pub mod error;
pub mod models;
pub mod reports;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::collector::{CredentialSource, MetricsCollector};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
