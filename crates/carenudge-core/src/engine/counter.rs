//! Day-boundary-aware delivery counter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Deliveries counted against a single calendar day. The reset is a pure
/// function of the date, checked before any delivery rather than driven by
/// a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub date: NaiveDate,
    pub count: u32,
}

impl DailyCounter {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }

    /// Reset the count when `today` has moved past the stored date.
    /// Returns whether a reset happened.
    pub fn reset_if_new_day(&mut self, today: NaiveDate) -> bool {
        if today != self.date {
            self.date = today;
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn same_day_keeps_count() {
        let mut counter = DailyCounter::new(day(10));
        counter.increment();
        counter.increment();
        assert!(!counter.reset_if_new_day(day(10)));
        assert_eq!(counter.count, 2);
    }

    #[test]
    fn new_day_resets() {
        let mut counter = DailyCounter::new(day(10));
        counter.increment();
        assert!(counter.reset_if_new_day(day(11)));
        assert_eq!(counter.count, 0);
        assert_eq!(counter.date, day(11));
    }
}
