use chrono::{DateTime, Utc};

use crate::date::guess::parse_name_time;

/// Structured fields of a media file name, e.g. `00010-yp0038.jpg`:
///
/// - `00010-` global order prefix left by a previous run
/// - `yp0038.jpg` permanent part, stable across renames
/// - `yp` source key, `38` source order
/// - `jpg` extension
///
/// Absent fields are empty strings or zero; parsing never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Original file name
    pub name: String,
    pub global_order: u64,
    permanent_start: usize,
    pub source_key: String,
    pub source_order: u64,
    /// Byte index just past the source order digits, if there is a source key
    source_order_end: Option<usize>,
    pub extension: String,
    /// Capture time encoded in the name (`yyyyMMdd_HHmmss[SSS]`)
    pub parsed_time: Option<DateTime<Utc>>,
}

impl ParsedName {
    pub fn parse(name: &str) -> Self {
        let bytes = name.as_bytes();

        let prefix_end = digit_run_end(bytes, 0);
        let dash_follows = bytes.get(prefix_end) == Some(&b'-');
        let global_order = if prefix_end > 0 && dash_follows {
            parse_number(&name[..prefix_end])
        } else {
            0
        };
        // a dash at the very end is part of the name, not a prefix separator
        let permanent_start = if dash_follows && bytes.len() > prefix_end + 1 {
            prefix_end + 1
        } else {
            0
        };

        let key_end = key_run_end(bytes, permanent_start);
        let has_key = key_end > permanent_start && is_digit_at(bytes, key_end);
        let (source_key, source_order, source_order_end) = if has_key {
            let order_end = digit_run_end(bytes, key_end);
            (
                name[permanent_start..key_end].to_string(),
                parse_number(&name[key_end..order_end]),
                Some(order_end),
            )
        } else {
            (String::new(), 0, None)
        };

        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default();

        let mut parsed = Self {
            name: name.to_string(),
            global_order,
            permanent_start,
            source_key,
            source_order,
            source_order_end,
            extension,
            parsed_time: None,
        };
        parsed.parsed_time = parse_name_time(drop_extension(parsed.name_after_source_order()));
        parsed
    }

    pub fn has_source_timeline(&self) -> bool {
        !self.source_key.is_empty()
    }

    /// The name without the global order prefix.
    pub fn permanent_part(&self) -> &str {
        &self.name[self.permanent_start..]
    }

    /// The rest of the name after the source order digits, one `-` skipped.
    /// The whole name when there is no source timeline.
    pub fn name_after_source_order(&self) -> &str {
        match self.source_order_end {
            Some(end) => {
                let rest = &self.name[end..];
                rest.strip_prefix('-').unwrap_or(rest)
            }
            None => &self.name,
        }
    }
}

fn drop_extension(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

fn is_digit_at(bytes: &[u8], ind: usize) -> bool {
    bytes.get(ind).is_some_and(u8::is_ascii_digit)
}

fn digit_run_end(bytes: &[u8], start: usize) -> usize {
    let mut ind = start;
    while is_digit_at(bytes, ind) {
        ind += 1;
    }
    ind
}

// Multi-byte UTF-8 sequences never contain ASCII bytes, so stopping on a digit
// or `-` always lands on a char boundary.
fn key_run_end(bytes: &[u8], start: usize) -> usize {
    let mut ind = start;
    while bytes.get(ind).is_some_and(|b| !b.is_ascii_digit() && *b != b'-') {
        ind += 1;
    }
    ind
}

fn parse_number(digits: &str) -> u64 {
    digits.parse().unwrap_or(0)
}
