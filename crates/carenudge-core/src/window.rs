//! Time windows and the clock/timezone resolver.
//!
//! A time window is a named part of the day (morning/midday/evening) during
//! which a nudge may be delivered. The resolver turns a window into the next
//! concrete instant in the user's local timezone: window start plus a
//! configurable offset, rolling to tomorrow when that time has already
//! passed today.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A named part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Morning,
    Midday,
    Evening,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [TimeWindow::Morning, TimeWindow::Midday, TimeWindow::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Morning => "morning",
            TimeWindow::Midday => "midday",
            TimeWindow::Evening => "evening",
        }
    }

    /// Built-in hours, used when the user has no override for the window.
    pub fn default_hours(self) -> WindowHours {
        match self {
            TimeWindow::Morning => WindowHours { start_hour: 7, end_hour: 11 },
            TimeWindow::Midday => WindowHours { start_hour: 11, end_hour: 16 },
            TimeWindow::Evening => WindowHours { start_hour: 16, end_hour: 21 },
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeWindow::Morning),
            "midday" => Ok(TimeWindow::Midday),
            "evening" => Ok(TimeWindow::Evening),
            other => Err(format!("unknown time window: {other}")),
        }
    }
}

/// Start/end hours of a window, in local time. `end_hour` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl WindowHours {
    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

/// User override of a window's start/end hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowCustomization {
    pub window: TimeWindow,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl TimeWindowCustomization {
    pub fn hours(&self) -> WindowHours {
        WindowHours {
            start_hour: self.start_hour,
            end_hour: self.end_hour,
        }
    }
}

/// Source of "now" and the user's local offset.
///
/// All scheduling math goes through this trait so the timezone properties
/// are testable with a fixed clock.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
    fn local_offset(&self) -> FixedOffset;

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&self.local_offset())
    }

    fn today_local(&self) -> NaiveDate {
        self.now_local().date_naive()
    }
}

/// Wall clock in the system's local timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Fixed clock for tests and replay.
#[derive(Debug, Clone)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_offset(&self) -> FixedOffset {
        self.offset
    }
}

/// Next delivery instant for a window: start hour plus `offset_min`, today
/// if still ahead in local time, otherwise the same local time tomorrow.
///
/// Returns `None` only for out-of-range hours, which validated settings
/// never produce.
pub fn next_delivery_instant(
    clock: &dyn Clock,
    hours: &WindowHours,
    offset_min: i64,
) -> Option<DateTime<Utc>> {
    let offset = clock.local_offset();
    let now_local = clock.now_local();
    let base = now_local
        .date_naive()
        .and_hms_opt(hours.start_hour, 0, 0)?
        .and_local_timezone(offset)
        .single()?
        + Duration::minutes(offset_min);
    let target = if base <= now_local {
        base + Duration::days(1)
    } else {
        base
    };
    Some(target.with_timezone(&Utc))
}

/// Whether the window's delivery instant still falls on `today` in local time.
pub fn due_today(clock: &dyn Clock, hours: &WindowHours, offset_min: i64) -> bool {
    match next_delivery_instant(clock, hours, offset_min) {
        Some(at) => at.with_timezone(&clock.local_offset()).date_naive() == clock.today_local(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock_at(hour: u32, min: u32) -> FixedClock {
        // UTC+2 local time.
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2026, 3, 10, hour, min, 0).unwrap();
        FixedClock {
            now: local.with_timezone(&Utc),
            offset,
        }
    }

    #[test]
    fn past_window_rolls_to_tomorrow() {
        // now = 09:00 local, morning start 07:00 + 60min -> 08:00 already
        // passed, so tomorrow 08:00 local.
        let clock = clock_at(9, 0);
        let hours = TimeWindow::Morning.default_hours();
        let at = next_delivery_instant(&clock, &hours, 60).unwrap();
        let local = at.with_timezone(&clock.offset);
        assert_eq!(local.date_naive(), clock.today_local().succ_opt().unwrap());
        assert_eq!(local.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn future_window_stays_today() {
        let clock = clock_at(6, 0);
        let hours = TimeWindow::Morning.default_hours();
        let at = next_delivery_instant(&clock, &hours, 60).unwrap();
        let local = at.with_timezone(&clock.offset);
        assert_eq!(local.date_naive(), clock.today_local());
        assert_eq!(local.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn exact_boundary_rolls_over() {
        let clock = clock_at(8, 0);
        let hours = TimeWindow::Morning.default_hours();
        let at = next_delivery_instant(&clock, &hours, 60).unwrap();
        let local = at.with_timezone(&clock.offset);
        assert_eq!(local.date_naive(), clock.today_local().succ_opt().unwrap());
    }

    #[test]
    fn due_today_tracks_rollover() {
        let hours = TimeWindow::Evening.default_hours();
        assert!(due_today(&clock_at(12, 0), &hours, 60));
        assert!(!due_today(&clock_at(18, 0), &hours, 60));
    }

    #[test]
    fn window_lookup_round_trips() {
        for window in TimeWindow::ALL {
            assert_eq!(window.as_str().parse::<TimeWindow>().unwrap(), window);
        }
        assert!("afternoon".parse::<TimeWindow>().is_err());
    }
}
