//! Uptime formatting for the monitoring header.

/// Render an uptime in seconds as minutes, or hours past 61 minutes.
///
/// Minutes are rounded to two decimals before the hours decision, so
/// 3660 seconds reads "61.00 minutes" and 3661 seconds reads "1.02 hours".
pub fn humanize_uptime(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite()) else {
        return "N/A".to_string();
    };

    let minutes = (seconds / 60.0 * 100.0).round() / 100.0;
    if minutes > 61.0 {
        format!("{:.2} hours", minutes / 60.0)
    } else {
        format!("{:.2} minutes", minutes)
    }
}
