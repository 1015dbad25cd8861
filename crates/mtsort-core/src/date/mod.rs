pub mod guess;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use filetime::FileTime;

/// Interpret a wall-clock time in the local timezone of the running process.
/// Times falling into a DST gap or fold have no single instant and yield `None`.
pub fn from_local(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    naive
        .and_local_timezone(Local)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

pub fn from_file_time(ft: FileTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ft.unix_seconds(), ft.nanoseconds())
}

pub fn to_file_time(time: DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(time.timestamp(), time.timestamp_subsec_nanos())
}

/// Local wall-clock rendering used in log lines.
pub fn display_local(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_time_conversion_keeps_millis() {
        let time = Utc.with_ymd_and_hms(2020, 7, 18, 21, 7, 25).unwrap()
            + chrono::TimeDelta::milliseconds(910);
        let ft = to_file_time(time);
        assert_eq!(ft.unix_seconds(), time.timestamp());
        assert_eq!(from_file_time(ft), Some(time));
    }
}
