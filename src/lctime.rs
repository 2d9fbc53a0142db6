//! Conversions between absolute instants and calendar days in a user's timezone.
//!
//! Nothing in here fails: bad zone input degrades to UTC and is logged as a warning.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Whole-hour UTC offsets and the IANA zone used to represent each one.
/// The `Etc/GMT` zones have inverted signs and never observe DST.
const OFFSET_ZONES: [(&str, &str); 24] = [
    ("-11:00", "Etc/GMT+11"),
    ("-10:00", "Etc/GMT+10"),
    ("-09:00", "Etc/GMT+9"),
    ("-08:00", "Etc/GMT+8"),
    ("-07:00", "Etc/GMT+7"),
    ("-06:00", "Etc/GMT+6"),
    ("-05:00", "Etc/GMT+5"),
    ("-04:00", "Etc/GMT+4"),
    ("-03:00", "Etc/GMT+3"),
    ("-02:00", "Etc/GMT+2"),
    ("-01:00", "Etc/GMT+1"),
    ("+00:00", "UTC"),
    ("+01:00", "Etc/GMT-1"),
    ("+02:00", "Etc/GMT-2"),
    ("+03:00", "Etc/GMT-3"),
    ("+04:00", "Etc/GMT-4"),
    ("+05:00", "Etc/GMT-5"),
    ("+06:00", "Etc/GMT-6"),
    ("+07:00", "Etc/GMT-7"),
    ("+08:00", "Etc/GMT-8"),
    ("+09:00", "Etc/GMT-9"),
    ("+10:00", "Etc/GMT-10"),
    ("+11:00", "Etc/GMT-11"),
    ("+12:00", "Etc/GMT-12"),
];

const DEFAULT_ZONE: &str = "UTC";

// Accepts `+5`, `-05`, `+05:00`, `+0530`, after any `UTC`/`GMT` prefix is stripped.
static OFFSET_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^([+-])(\d{1,2})(?::?(\d{2}))?$").expect("offset regex is valid")
});

pub fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

pub fn datetime_to_timestamp(datetime: &DateTime<Utc>) -> i64 {
    datetime.timestamp()
}

/// UTC offset (`±HH:MM`) of `zone` at the current instant.
pub fn utc_offset(zone: &str) -> String {
    utc_offset_at(zone, Utc::now())
}

/// UTC offset (`±HH:MM`) of `zone` at `instant`. Unknown zones report `+00:00`.
pub fn utc_offset_at(zone: &str, instant: DateTime<Utc>) -> String {
    let tz = parse_timezone(zone);
    tz.offset_from_utc_datetime(&instant.naive_utc()).fix().to_string()
}

/// Maps a stored timezone value onto an IANA zone name.
///
/// IANA names (anything with a `/`) pass through untouched, whole-hour offsets map through
/// [`OFFSET_ZONES`], and everything else falls back to UTC.
pub fn iana_timezone(input: Option<&str>) -> String {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::from(DEFAULT_ZONE);
    };

    if raw.contains('/') {
        return raw.to_string();
    }

    match normalize_offset(raw)
        .and_then(|offset| OFFSET_ZONES.iter().find(|(key, _)| *key == offset))
    {
        Some((_, zone)) => zone.to_string(),
        None => {
            log::warn!("[iana_timezone] Unrecognized timezone '{raw}', defaulting to {DEFAULT_ZONE}.");
            String::from(DEFAULT_ZONE)
        }
    }
}

/// Canonical form of a user-entered timezone for storage, or `None` if it can't be resolved.
///
/// IANA names are kept so DST still applies. Offset spellings become `±HH:MM`, and only
/// the whole-hour offsets in [`OFFSET_ZONES`] are accepted.
pub fn normalize_timezone(input: &str) -> Option<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('/') {
        return raw.parse::<Tz>().ok().map(|tz| tz.name().to_string());
    }

    normalize_offset(raw)
        .filter(|offset| OFFSET_ZONES.iter().any(|(key, _)| *key == offset.as_str()))
}

/// Resolves a stored timezone value into a usable zone, degrading to UTC.
pub fn resolve_timezone(input: Option<&str>) -> Tz {
    parse_timezone(&iana_timezone(input))
}

fn parse_timezone(zone: &str) -> Tz {
    zone.parse::<Tz>().unwrap_or_else(|err| {
        log::warn!("[parse_timezone] Could not parse timezone '{zone}' ({err}), using UTC.");
        Tz::UTC
    })
}

/// Rewrites offset spellings into the `±HH:MM` form used as keys in [`OFFSET_ZONES`].
fn normalize_offset(raw: &str) -> Option<String> {
    let upper = raw.to_ascii_uppercase();
    let stripped = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper)
        .trim();

    if stripped.is_empty() || upper == "Z" {
        return Some(String::from("+00:00"));
    }

    let caps = OFFSET_PATTERN.captures(stripped)?;
    let hours: u32 = caps[2].parse().ok()?;
    let minutes: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let sign = if hours == 0 && minutes == 0 { "+" } else { &caps[1] };

    Some(format!("{sign}{hours:02}:{minutes:02}"))
}

/// Calendar day of `timestamp` in `tz`.
pub fn local_date(timestamp: i64, tz: Tz) -> NaiveDate {
    timestamp_to_datetime(timestamp).with_timezone(&tz).date_naive()
}

/// `YYYY-MM-DD` label of the calendar day of `timestamp` in `tz`.
pub fn day_label(timestamp: i64, tz: Tz) -> String {
    local_date(timestamp, tz).format("%Y-%m-%d").to_string()
}

pub fn is_same_day(a: i64, b: i64, tz: Tz) -> bool {
    local_date(a, tz) == local_date(b, tz)
}

/// Whether `a` falls on the calendar day right after the one `b` falls on.
pub fn is_next_day(a: i64, b: i64, tz: Tz) -> bool {
    local_date(b, tz).succ_opt() == Some(local_date(a, tz))
}
