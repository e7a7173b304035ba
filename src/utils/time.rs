//! Time parsing and formatting utilities

use crate::error::{SeamcutError, SeamcutResult};

/// Parse a user-supplied time: seconds, `MM:SS[.ms]` or `HH:MM:SS[.ms]`
pub fn parse_time(value: &str) -> SeamcutResult<f64> {
    let value = value.trim();
    let invalid = || SeamcutError::InvalidTimeFormat {
        time: value.to_string(),
    };

    let parts: Vec<&str> = value.split(':').collect();
    let seconds = match parts.as_slice() {
        [seconds] => seconds.parse::<f64>().map_err(|_| invalid())?,
        [minutes, seconds] => {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds = parse_seconds_field(seconds).ok_or_else(invalid)?;
            minutes as f64 * 60.0 + seconds
        }
        [hours, minutes, seconds] => {
            let hours: u64 = hours.parse().map_err(|_| invalid())?;
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            if minutes >= 60 {
                return Err(invalid());
            }
            let seconds = parse_seconds_field(seconds).ok_or_else(invalid)?;
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds
        }
        _ => return Err(invalid()),
    };

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }
    Ok(seconds)
}

fn parse_seconds_field(value: &str) -> Option<f64> {
    let seconds: f64 = value.parse().ok()?;
    (0.0..60.0).contains(&seconds).then_some(seconds)
}

/// Seconds as passed to the tool (`-ss`, `-t`)
pub fn format_seconds_arg(seconds: f64) -> String {
    format!("{:.5}", seconds)
}

/// `HH:MM:SS.mmm` for display
pub fn format_timecode(seconds: f64) -> String {
    let (h, m, s, ms) = split(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// `HH.MM.SS.mmm`, safe for file names
pub fn format_file_timestamp(seconds: f64) -> String {
    let (h, m, s, ms) = split(seconds);
    format!("{:02}.{:02}.{:02}.{:03}", h, m, s, ms)
}

fn split(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    (
        total_ms / 3_600_000,
        (total_ms / 60_000) % 60,
        (total_ms / 1000) % 60,
        total_ms % 1000,
    )
}
