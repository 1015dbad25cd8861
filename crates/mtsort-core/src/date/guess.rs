use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use std::sync::LazyLock;

// yyyyMMdd_HHmmss at the first digit, up to 3 millisecond digits, then end or a `-`/`.` separator
static NAME_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^0-9]*(?P<date>[0-9]{8}_[0-9]{6})(?P<millis>[0-9]{0,3})(?:[-.]|$)").unwrap()
});

const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Parse a capture time from the part of a file name that follows the source
/// order, with the extension already removed.
///
/// The time is local to the running process. Trailing text glued to the
/// seconds or milliseconds (`..._210725000_Organic_Maps`) makes the whole
/// match fail rather than produce a partial timestamp.
pub fn parse_name_time(text: &str) -> Option<DateTime<Utc>> {
    let caps = NAME_TIME_RE.captures(text)?;
    let naive = NaiveDateTime::parse_from_str(caps.name("date")?.as_str(), NAME_TIME_FORMAT).ok()?;
    let millis = match caps.name("millis").map(|m| m.as_str()) {
        Some(digits) if !digits.is_empty() => digits.parse::<i64>().ok()?,
        _ => 0,
    };
    super::from_local(naive + TimeDelta::milliseconds(millis))
}
