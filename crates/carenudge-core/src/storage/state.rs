//! Persisted scheduler snapshot.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SchedulerStatus;

/// Snapshot of the delivery engine, written on every mutation and on
/// suspend. This is the sole recovery anchor at the next initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub is_initialized: bool,
    pub status: SchedulerStatus,
    pub scheduled_nudge_ids: Vec<u32>,
    pub notifications_delivered_today: u32,
    #[serde(default)]
    pub last_delivery_date: Option<NaiveDate>,
    /// Must always reflect the most recent mutation.
    pub saved_timestamp: DateTime<Utc>,
}

impl ServiceState {
    /// A snapshot older than `threshold` cannot be trusted: the process was
    /// gone long enough that persisted schedule times may already be in the
    /// past, so the loader re-derives schedules instead.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        now - self.saved_timestamp > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_threshold() {
        let now = Utc::now();
        let state = ServiceState {
            is_initialized: true,
            status: SchedulerStatus::Ready,
            scheduled_nudge_ids: vec![1001],
            notifications_delivered_today: 1,
            last_delivery_date: None,
            saved_timestamp: now - Duration::hours(7),
        };
        assert!(state.is_stale(now, Duration::hours(6)));
        assert!(!state.is_stale(now, Duration::hours(8)));
    }
}
