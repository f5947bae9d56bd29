//! Analytics report queries
//!
//! All queries of an invocation share one access token and run concurrently.

mod fetcher;
mod wire;

pub use fetcher::{ReportFetcher, DEFAULT_REPORTING_ENDPOINT};
