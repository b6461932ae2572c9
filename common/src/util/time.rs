use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::Time;

/// Placeholder for "not reached" in a forward search. Far enough from `i32::MAX` that adding a
/// few days of travel time to it cannot overflow.
pub const UNREACHED_FORWARD: Time = i32::MAX / 2;
/// Placeholder for "not reached" in a reverse search.
pub const UNREACHED_REVERSE: Time = i32::MIN / 2;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    Format(String),
    Range(String),
}

impl Display for TimeParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TimeParseError::Format(s) => write!(f, "'{}' is not a time of the form HH:MM[:SS]", s),
            TimeParseError::Range(s) => write!(f, "minutes or seconds out of range in '{}'", s),
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS` into seconds since midnight. Hours may exceed 23 and may be
/// prefixed with `-` for times on the previous day.
pub fn parse_time(value: &str) -> Result<Time, TimeParseError> {
    let trimmed = value.trim();
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed),
    };

    let parts = body.split(':')
        .map(|p| p.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| TimeParseError::Format(value.to_owned()))?;

    let (h, m, s) = match parts.as_slice() {
        [h, m] => (*h, *m, 0),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(TimeParseError::Format(value.to_owned())),
    };
    if m >= 60 || s >= 60 {
        return Err(TimeParseError::Range(value.to_owned()));
    }
    let total = h.checked_mul(3600)
        .and_then(|t| t.checked_add(m * 60 + s))
        .and_then(|t| Time::try_from(t).ok())
        .ok_or_else(|| TimeParseError::Range(value.to_owned()))?;

    Ok(sign * total)
}

/// `HH:MM`, or `HH:MM:SS` if the seconds are non-zero
pub fn format_time(time: Time) -> String {
    if time == UNREACHED_FORWARD || time == UNREACHED_REVERSE {
        return "-".to_owned();
    }
    let sign = if time < 0 { "-" } else { "" };
    let t = time.unsigned_abs();
    let (h, m, s) = (t / 3600, (t / 60) % 60, t % 60);
    if s == 0 {
        format!("{sign}{h:02}:{m:02}")
    } else {
        format!("{sign}{h:02}:{m:02}:{s:02}")
    }
}

/// Compact duration, e.g. `1h2m5s`, `12m`, `0s`
pub fn format_duration(duration: Time) -> String {
    let sign = if duration < 0 { "-" } else { "" };
    let d = duration.unsigned_abs();
    let (h, m, s) = (d / 3600, (d / 60) % 60, d % 60);

    let mut out = String::from(sign);
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || (h == 0 && m == 0) {
        out.push_str(&format!("{s}s"));
    }
    out
}

/// Converts a search-local time to a timestamp on the given service day
pub fn to_date_time(service_day: NaiveDate, time: Time) -> NaiveDateTime {
    service_day.and_time(NaiveTime::MIN) + Duration::seconds(time as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("10:00"), Ok(36_000));
        assert_eq!(parse_time("09:57:30"), Ok(9 * 3600 + 57 * 60 + 30));
        assert_eq!(parse_time("25:10"), Ok(25 * 3600 + 600));
        assert_eq!(parse_time("-00:30"), Ok(-1800));
        assert_eq!(parse_time(" 7:05 "), Ok(7 * 3600 + 300));
    }

    #[test]
    fn test_parse_time_errors() {
        assert!(matches!(parse_time("10"), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time("ab:cd"), Err(TimeParseError::Format(_))));
        assert!(matches!(parse_time("10:60"), Err(TimeParseError::Range(_))));
        assert!(matches!(parse_time("10:00:61"), Err(TimeParseError::Range(_))));
        assert!(matches!(parse_time("1:2:3:4"), Err(TimeParseError::Format(_))));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(36_000), "10:00");
        assert_eq!(format_time(36_005), "10:00:05");
        assert_eq!(format_time(-1800), "-00:30");
        assert_eq!(format_time(UNREACHED_FORWARD), "-");
        for t in [0, 59, 3600, 86_399, 90_000] {
            assert_eq!(parse_time(&format_time(t)), Ok(t));
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(120), "2m");
        assert_eq!(format_duration(3600 + 59 * 60 + 45), "1h59m45s");
        assert_eq!(format_duration(3605), "1h5s");
    }

    #[test]
    fn test_date_time_conversion() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let dt = to_date_time(day, 25 * 3600);
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
    }
}
