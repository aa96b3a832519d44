use chrono::TimeDelta;

/// Compact span notation used by chart APIs: `7d`, `1h`, `30m`, `45s`.
pub fn format_span(span: TimeDelta) -> String {
    let secs = span.num_seconds();
    if secs != 0 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs != 0 && secs % 3_600 == 0 {
        format!("{}h", secs / 3_600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
