//! The `YYYYMMDDhhmmss` timestamp dialect used on every wire surface.
//!
//! Existing station clients send and expect this exact 14-digit form, so the
//! codec is strict in both directions. Timestamps are naive; the server clock
//! (UTC) is the single reference.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const STAMP: &[FormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

/// A string failed to parse as a `YYYYMMDDhhmmss` timestamp.
#[derive(Debug, thiserror::Error)]
#[error("expected a YYYYMMDDhhmmss timestamp, got '{0}'")]
pub struct ParseStampError(pub String);

/// Parse a strict 14-digit timestamp.
pub fn parse(raw: &str) -> Result<PrimitiveDateTime, ParseStampError> {
    if raw.len() != 14 {
        return Err(ParseStampError(raw.to_owned()));
    }
    PrimitiveDateTime::parse(raw, STAMP).map_err(|_| ParseStampError(raw.to_owned()))
}

/// Format a timestamp into the 14-digit form.
pub fn format(stamp: PrimitiveDateTime) -> String {
    // The format description is infallible for any in-range datetime.
    stamp.format(STAMP).expect("YYYYMMDDhhmmss formatting cannot fail")
}

/// Current server time as a naive timestamp.
pub fn now() -> PrimitiveDateTime {
    let offset = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(offset.date(), offset.time())
}

/// Today at 00:00:00.
pub fn start_of_today() -> PrimitiveDateTime {
    now().date().midnight()
}

/// The first of the current month at 00:00:00.
pub fn start_of_month() -> PrimitiveDateTime {
    let today = now().date();
    today
        .replace_day(1)
        .expect("day 1 exists in every month")
        .midnight()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parses_and_formats_the_station_dialect() {
        let stamp = parse("20250121120000").unwrap();
        assert_eq!(stamp, datetime!(2025-01-21 12:00:00));
        assert_eq!(format(stamp), "20250121120000");
    }

    #[test]
    fn rejects_malformed_stamps() {
        for bad in ["2025-01-21", "2025012112000", "202501211200001", "2025012112000a", ""] {
            assert!(parse(bad).is_err(), "accepted {bad:?}");
        }
        // Out-of-range components are also malformed.
        assert!(parse("20251321120000").is_err());
        assert!(parse("20250121250000").is_err());
    }

    #[test]
    fn window_defaults_are_midnight_aligned() {
        let today = start_of_today();
        assert_eq!((today.hour(), today.minute(), today.second()), (0, 0, 0));
        let month = start_of_month();
        assert_eq!(month.day(), 1);
        assert!(month <= today);
    }
}
