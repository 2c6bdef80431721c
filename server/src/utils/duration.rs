//! ISO-8601 durations as returned by the Service Bus management endpoint.
//!
//! Only the subset the endpoint emits is accepted: `P[nY][nM][nW][nD][T[nH][nM][n[.f]S]]`.
//! Years count as 365 days and months as 30 days.

use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// Parse an ISO-8601 duration such as `PT1M` or `P10675199DT2H48M5.4775807S`.
///
/// Returns `None` for anything outside the supported subset.
pub fn parse_iso8601_duration(input: &str) -> Option<Duration> {
    let rest = input.trim().strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, Some(time)),
        Some(_) => return None,
        None => (rest, None),
    };

    let mut total = Duration::ZERO;
    for (value, unit) in components(date_part)? {
        let whole = whole_number(&value)?;
        let seconds = match unit {
            'Y' => whole.checked_mul(365 * SECONDS_PER_DAY)?,
            'M' => whole.checked_mul(30 * SECONDS_PER_DAY)?,
            'W' => whole.checked_mul(7 * SECONDS_PER_DAY)?,
            'D' => whole.checked_mul(SECONDS_PER_DAY)?,
            _ => return None,
        };
        total = total.checked_add(Duration::from_secs(seconds))?;
    }

    if let Some(time_part) = time_part {
        for (value, unit) in components(time_part)? {
            let part = match unit {
                'H' => Duration::from_secs(whole_number(&value)?.checked_mul(SECONDS_PER_HOUR)?),
                'M' => {
                    Duration::from_secs(whole_number(&value)?.checked_mul(SECONDS_PER_MINUTE)?)
                }
                'S' => fractional_seconds(&value)?,
                _ => return None,
            };
            total = total.checked_add(part)?;
        }
    }

    Some(total)
}

/// Render a duration compactly, e.g. `1m`, `2h 30m`, `14d`, `5.477s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    if secs == 0 && millis == 0 {
        return "0s".to_string();
    }

    let days = secs / SECONDS_PER_DAY;
    let hours = (secs % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = secs % SECONDS_PER_MINUTE;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if millis > 0 {
        parts.push(format!("{seconds}.{millis:03}s"));
    } else if seconds > 0 {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

fn components(part: &str) -> Option<Vec<(String, char)>> {
    let mut result = Vec::new();
    let mut value = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' {
            value.push(c);
        } else if value.is_empty() {
            return None;
        } else {
            result.push((std::mem::take(&mut value), c));
        }
    }
    value.is_empty().then_some(result)
}

fn whole_number(value: &str) -> Option<u64> {
    value.parse().ok()
}

fn fractional_seconds(value: &str) -> Option<Duration> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let secs: u64 = whole.parse().ok()?;
    if fraction.is_empty() {
        return Some(Duration::from_secs(secs));
    }
    // nanosecond precision at most
    let digits: String = fraction.chars().take(9).collect();
    let scale = 10u32.pow(9 - digits.len() as u32);
    let nanos: u32 = digits.parse::<u32>().ok()?.checked_mul(scale)?;
    Some(Duration::new(secs, nanos))
}
