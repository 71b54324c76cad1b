//! Conversions for values arriving from the hub as strings.

/// Parse a duration into seconds.
///
/// Accepts a number with an `h`, `m` or `s` suffix (only the leading integer
/// counts, so `"1.5h"` is one hour), a clock time `hh:mm` or `hh:mm:ss`, or a
/// plain number. Anything unreadable is zero.
pub fn to_seconds(value: &str) -> f64 {
    let value = value.trim().to_lowercase();
    if let Some(n) = value.strip_suffix('h') {
        leading_int(n) * 3600.0
    } else if let Some(n) = value.strip_suffix('m') {
        leading_int(n) * 60.0
    } else if let Some(n) = value.strip_suffix('s') {
        leading_int(n)
    } else if value.contains(':') {
        clock_seconds(&value)
    } else {
        value.parse().unwrap_or(0.0)
    }
}

/// Truthiness of a hub value: `true`/`yes` are true, `false`/`no`/`0` and
/// the empty string are false, any other text is true.
pub fn to_bool(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "no" | "0"
    )
}

fn leading_int(text: &str) -> f64 {
    let text = text.trim_start();
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let end = text[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |pos| pos + digits_from);
    text[..end].parse::<i64>().map_or(0.0, |n| n as f64)
}

// "hh:mm" or "hh:mm:ss"
fn clock_seconds(text: &str) -> f64 {
    let mut total = 0.0;
    let mut parts = 0;
    for (part, scale) in text.split(':').zip([3600.0, 60.0, 1.0]) {
        match part.trim().parse::<f64>() {
            Ok(n) => total += n * scale,
            Err(_) => return 0.0,
        }
        parts += 1;
    }
    if parts == text.split(':').count() {
        total
    } else {
        0.0
    }
}
