//! Daily window resolution
//!
//! Maps an instant to the half-open local-day interval used by every daily
//! aggregate. The instant is always passed in by the caller so the write
//! path, the read path, and tests all agree on what "today" means.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// Half-open interval `[start, end)` covering one local calendar day
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

/// Timezone policy defining where the local day boundary falls
#[derive(Debug, Clone, Copy)]
pub struct DayPolicy {
    offset: FixedOffset,
}

impl DayPolicy {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// UTC day boundaries
    pub fn utc() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }

    /// The local-day window containing `now`
    pub fn window_containing(&self, now: DateTime<Utc>) -> DayWindow {
        let local = now.with_timezone(&self.offset);
        let local_midnight = local.date_naive().and_time(NaiveTime::MIN);
        // A fixed offset has no gaps or folds, so local midnight maps back to
        // UTC by plain subtraction.
        let start = Utc.from_utc_datetime(
            &(local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()))),
        );
        DayWindow {
            start,
            end: start + Duration::days(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_window() {
        let policy = DayPolicy::utc();
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 13, 45, 0).unwrap();
        let window = policy.window_containing(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap());
        assert!(window.contains(now));
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_positive_offset_shifts_boundary() {
        // UTC+9: the local day starts at 15:00 UTC of the previous date
        let policy = DayPolicy::new(FixedOffset::east_opt(9 * 3600).unwrap());
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 20, 0, 0).unwrap(); // 05:00 local, Mar 16
        let window = policy.window_containing(now);

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 15, 15, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 16, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_same_window_for_all_instants_in_day() {
        let policy = DayPolicy::utc();
        let morning = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();

        assert_eq!(
            policy.window_containing(morning),
            policy.window_containing(night)
        );
    }

    #[test]
    fn test_adjacent_days_do_not_overlap() {
        let policy = DayPolicy::new(FixedOffset::west_opt(5 * 3600).unwrap());
        let today = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let tomorrow = today + Duration::days(1);

        let w1 = policy.window_containing(today);
        let w2 = policy.window_containing(tomorrow);
        assert_eq!(w1.end, w2.start);
    }
}
