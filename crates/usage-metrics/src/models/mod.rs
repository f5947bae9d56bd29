//! Data models for usage-metrics

mod credentials;
mod report;
mod snapshot;

pub use credentials::*;
pub use report::*;
pub use snapshot::*;
