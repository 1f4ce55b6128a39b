use chrono::{Datelike, Utc};

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// `m:ss` for a duration in seconds; absent, negative or non-finite values give `"0:00"`.
pub fn format_time(seconds: Option<f64>) -> String {
    let secs = match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => s,
        _ => 0.0,
    };
    let minutes = (secs / 60.0).floor() as u64;
    let rest = (secs % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, rest)
}
