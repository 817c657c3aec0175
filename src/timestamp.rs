//! Timestamp formatting and parsing shared by the encoders and the SRT reader.
//!
//! All formatters round to the nearest millisecond first so `f64` noise never shows up as an
//! off-by-one in the printed digits.

use tracing::debug;

struct Parts {
    h: u64,
    m: u64,
    s: u64,
    ms: u64,
}

fn split(seconds: f64) -> Parts {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let total_m = total_s / 60;

    Parts {
        h: total_m / 60,
        m: total_m % 60,
        s,
        ms,
    }
}

/// `HH:MM:SS,mmm`, the SubRip cue timing format.
pub fn format_srt(seconds: f64) -> String {
    let Parts { h, m, s, ms } = split(seconds);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

/// `HH:MM:SS.mmm`, the WebVTT cue timing format.
pub fn format_vtt(seconds: f64) -> String {
    let Parts { h, m, s, ms } = split(seconds);
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// `HH:MM:SS`, whole seconds (milliseconds truncated by rounding first).
pub fn format_clock(seconds: f64) -> String {
    let Parts { h, m, s, .. } = split(seconds);
    format!("{h:02}:{m:02}:{s:02}")
}

/// `MM:SS` under an hour, `HH:MM:SS` from an hour on.
pub fn format_short_clock(seconds: f64) -> String {
    let Parts { h, m, s, .. } = split(seconds);
    if h >= 1 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Parse `HH:MM:SS,mmm` (or with `.` as the decimal separator) into seconds.
///
/// Malformed input parses as zero so one bad cue does not abort an import.
pub fn parse_srt_timestamp(value: &str) -> f64 {
    match try_parse(value.trim()) {
        Some(seconds) => seconds,
        None => {
            debug!(value, "unparseable timestamp, using zero");
            0.0
        }
    }
}

fn try_parse(value: &str) -> Option<f64> {
    let normalized = value.replace(',', ".");
    let (clock, millis) = normalized.split_once('.')?;

    let mut fields = clock.split(':');
    let h = parse_digits(fields.next()?, 1, 3)?;
    let m = parse_digits(fields.next()?, 2, 2)?;
    let s = parse_digits(fields.next()?, 2, 2)?;
    if fields.next().is_some() || m >= 60 || s >= 60 {
        return None;
    }

    let ms = parse_digits(millis, 3, 3)?;
    Some((h * 3600 + m * 60 + s) as f64 + ms as f64 / 1000.0)
}

fn parse_digits(field: &str, min_len: usize, max_len: usize) -> Option<u64> {
    if !(min_len..=max_len).contains(&field.len()) || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
