//! Free-text time parsing.
//!
//! Durations ("30 minutes", "1.5 hours"), availability ("about 2 hrs") and
//! wall-clock times ("7:00 AM", "19:30") all arrive as user text. Parsers
//! here return `Option`; callers that need a value use the `*_or` helpers,
//! which fall back to a documented default and emit a debug event instead
//! of failing.

use once_cell::sync::Lazy;
use regex::Regex;

static MINUTES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(minute|hour|min|hr|h\b|m\b)").expect("static regex")
});

static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::(\d{2}))?\s*([ap])\.?\s*m?\.?\s*$|^\s*(\d{1,2}):(\d{2})\s*$")
        .expect("static regex")
});

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Extract a duration in minutes from text like "30 minutes" or "2 hours".
///
/// Only the first quantity is read. Fractional hours are rounded to the
/// nearest minute.
pub fn parse_minutes(text: &str) -> Option<u32> {
    let caps = MINUTES_RE.captures(text)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let minutes = if unit.starts_with('h') {
        amount * 60.0
    } else {
        amount
    };
    if minutes <= 0.0 {
        return None;
    }
    Some(minutes.round() as u32)
}

/// Like [`parse_minutes`], but returns `default` for unparsable text.
pub fn minutes_or(text: &str, default: u32) -> u32 {
    match parse_minutes(text) {
        Some(minutes) => minutes,
        None => {
            tracing::debug!(input = text, default, "unparsable duration, using default");
            default
        }
    }
}

/// Parse a wall-clock time to minutes since midnight.
///
/// Accepts "H:MM AM/PM", "H AM/PM" and 24-hour "HH:MM".
pub fn parse_clock(text: &str) -> Option<u32> {
    let caps = CLOCK_RE.captures(text)?;

    if let Some(hour) = caps.get(1) {
        let hour: u32 = hour.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) || minute >= 60 {
            return None;
        }
        let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("p");
        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        return Some(hour24 * 60 + minute);
    }

    let hour: u32 = caps.get(4)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;
    if hour >= 24 || minute >= 60 {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Like [`parse_clock`], but returns `default` for unparsable text.
pub fn clock_or(text: &str, default: u32) -> u32 {
    match parse_clock(text) {
        Some(minutes) => minutes,
        None => {
            tracing::debug!(input = text, default, "unparsable clock time, using default");
            default
        }
    }
}

/// Render minutes since midnight as "H:MM AM".
///
/// Values past midnight wrap around.
pub fn format_clock(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour24 = minutes / 60;
    let minute = minutes % 60;
    let (hour12, suffix) = match hour24 {
        0 => (12, "AM"),
        1..=11 => (hour24, "AM"),
        12 => (12, "PM"),
        _ => (hour24 - 12, "PM"),
    };
    format!("{hour12}:{minute:02} {suffix}")
}
