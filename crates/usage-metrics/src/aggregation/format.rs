//! Display formatting for metric values
//!
//! Formatting is total: missing, non-numeric and non-finite input all render
//! as zero.

/// Parse a metric value as returned upstream; anything unparsable is `0`
pub fn parse_metric(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Abbreviate a count for display.
///
/// Values of 1000 and above become thousands rounded half-up to one decimal
/// (`1250` → `"1.3k+"`, `2000` → `"2k+"`); smaller values keep thousands
/// separators (`850` → `"850+"`). Fractions are truncated first.
pub fn format_display_number(n: f64) -> String {
    let n = if n.is_finite() { n.trunc() as i64 } else { 0 };

    if n >= 1000 {
        // Integer arithmetic keeps x.x5 rounding away from zero.
        let tenths = (n.saturating_add(50)) / 100;
        let (whole, frac) = (tenths / 10, tenths % 10);
        if frac == 0 {
            format!("{whole}k+")
        } else {
            format!("{whole}.{frac}k+")
        }
    } else {
        format!("{}+", group_thousands(n))
    }
}

/// Format a raw upstream value; `None` counts as zero
pub fn format_display_value(raw: Option<&str>) -> String {
    format_display_number(raw.map_or(0.0, parse_metric))
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
