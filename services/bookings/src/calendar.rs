//! Day-boundary arithmetic in the booking timezone
//!
//! A booking applies to the calendar day its instant falls on in one fixed,
//! configured UTC offset. Day windows are half-open: `[start, start + 1 day)`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::models::DateInput;

/// Half-open UTC interval covering one booking day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Maps instants to booking days for a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingCalendar {
    offset: FixedOffset,
}

impl Default for BookingCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl BookingCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Calendar for an offset east of UTC in minutes; `None` if out of range
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The booking day an instant belongs to
    pub fn date_key(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Window of the given booking day; `None` at the edges of the representable range
    pub fn window_for_day(&self, day: NaiveDate) -> Option<DayWindow> {
        let local_midnight = day.and_time(NaiveTime::MIN);
        let utc_midnight = local_midnight
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))?;
        let start = Utc.from_utc_datetime(&utc_midnight);
        let end = start.checked_add_signed(Duration::days(1))?;
        Some(DayWindow { start, end })
    }

    /// Window of the day `instant` falls on
    pub fn day_window(&self, instant: DateTime<Utc>) -> Option<DayWindow> {
        self.window_for_day(self.date_key(instant))
    }

    /// Parse a client-supplied date
    ///
    /// Accepts an RFC 3339 instant, a bare `YYYY-MM-DD` (midnight of that
    /// booking day), or milliseconds since the Unix epoch as a number or
    /// digit string.
    pub fn parse_date(&self, input: &DateInput) -> Option<DateTime<Utc>> {
        match input {
            DateInput::Millis(millis) => Utc.timestamp_millis_opt(*millis).single(),
            DateInput::Text(text) => {
                let text = text.trim();
                if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
                    return Some(instant.with_timezone(&Utc));
                }
                if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    return self.window_for_day(day).map(|window| window.start);
                }
                text.parse::<i64>()
                    .ok()
                    .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_utc_window_is_half_open() {
        let calendar = BookingCalendar::utc();
        let window = calendar.window_for_day(day(2025, 3, 4)).unwrap();

        let midnight = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
        let next_midnight = Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap();

        assert_eq!(window.start, midnight);
        assert!(window.contains(midnight));
        assert!(window.contains(next_midnight - Duration::milliseconds(1)));
        assert!(!window.contains(next_midnight));
    }

    #[test]
    fn test_offset_shifts_day_boundaries() {
        // UTC+02:00: local midnight on 4 March is 22:00 UTC on 3 March
        let calendar = BookingCalendar::from_offset_minutes(120).unwrap();
        let window = calendar.window_for_day(day(2025, 3, 4)).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 3, 22, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 4, 22, 0, 0).unwrap());

        let late_evening_utc = Utc.with_ymd_and_hms(2025, 3, 3, 23, 30, 0).unwrap();
        assert_eq!(calendar.date_key(late_evening_utc), day(2025, 3, 4));
        assert_eq!(BookingCalendar::utc().date_key(late_evening_utc), day(2025, 3, 3));
    }

    #[test]
    fn test_negative_offset() {
        let calendar = BookingCalendar::from_offset_minutes(-300).unwrap();
        let window = calendar.window_for_day(day(2025, 1, 10)).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 1, 10, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        assert!(BookingCalendar::from_offset_minutes(24 * 60).is_none());
        assert!(BookingCalendar::from_offset_minutes(i32::MAX).is_none());
    }

    #[test]
    fn test_parse_date_forms() {
        let calendar = BookingCalendar::from_offset_minutes(60).unwrap();

        assert_eq!(
            calendar.parse_date(&DateInput::from("2025-03-04T09:00:00+01:00")),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 8, 0, 0).unwrap())
        );
        assert_eq!(
            calendar.parse_date(&DateInput::from("2025-03-04")),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 23, 0, 0).unwrap())
        );
        assert_eq!(
            calendar.parse_date(&DateInput::Millis(0)),
            Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            calendar.parse_date(&DateInput::from("86400000")),
            Some(Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let calendar = BookingCalendar::utc();

        assert_eq!(calendar.parse_date(&DateInput::from("tomorrow")), None);
        assert_eq!(calendar.parse_date(&DateInput::from("2025-02-30")), None);
        assert_eq!(calendar.parse_date(&DateInput::from("")), None);
        assert_eq!(calendar.parse_date(&DateInput::Millis(i64::MAX)), None);
    }

    #[test]
    fn test_last_representable_day_has_no_window() {
        let calendar = BookingCalendar::utc();
        let last_day = DateTime::<Utc>::MAX_UTC.date_naive();

        assert_eq!(calendar.window_for_day(last_day), None);
        assert_eq!(calendar.day_window(DateTime::<Utc>::MAX_UTC), None);
        assert_eq!(
            calendar.parse_date(&DateInput::from(last_day.format("%Y-%m-%d").to_string().as_str())),
            None
        );

        // east of UTC, midnight of the first representable day precedes the range
        let east = BookingCalendar::from_offset_minutes(60).unwrap();
        assert_eq!(east.window_for_day(NaiveDate::MIN), None);
    }
}
