//! Clock injection and the fixed-precision timestamp format.
//!
//! Timestamps are UTC ISO-8601 with exactly three fractional digits and a
//! `Z` suffix, e.g. `2026-10-16T08:15:30.123Z`. The string is hashed into
//! signatures, so it must be stable across formatting and reparsing.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{KmuError, KmuResult};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for reproducible output.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format with millisecond precision.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp; any RFC 3339 offset is accepted and normalized to UTC.
pub fn parse_timestamp(text: &str) -> KmuResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KmuError::InvalidFormat(format!("Invalid timestamp {:?}: {}", text, e)))
}

/// Current time from `clock`, already formatted.
pub fn now_string(clock: &dyn Clock) -> String {
    format_timestamp(&clock.now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_fixed_precision() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 16, 8, 15, 30).unwrap();
        assert_eq!(format_timestamp(&instant), "2026-10-16T08:15:30.000Z");
    }

    #[test]
    fn test_roundtrip_is_stable() {
        let text = "2026-10-16T08:15:30.123Z";
        let parsed = parse_timestamp(text).unwrap();
        assert_eq!(format_timestamp(&parsed), text);
    }

    #[test]
    fn test_offset_normalized_to_utc() {
        let parsed = parse_timestamp("2026-10-16T10:15:30.123+02:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2026-10-16T08:15:30.123Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(KmuError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(now_string(&clock), "2020-01-02T03:04:05.000Z");
    }
}
