//! Reduction and display formatting of report results

mod format;
mod reducer;

pub use format::{format_display_number, format_display_value, parse_metric};
pub use reducer::{build_snapshot, extract_metric_value, reduce, reduce_event_counts};
