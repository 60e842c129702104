//! SQLite-backed persistent state store.
//!
//! Single source of truth shared across foreground and background execution
//! contexts. Two tables: a `kv` table for scheduler state, counters, flags,
//! and reserved ranges, and a `deliveries` table for delivery records. All
//! writes are single statements, so a failed write never leaves partial
//! state behind.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::engine::counter::DailyCounter;
use crate::error::StoreError;
use crate::ids::ReservedIdRange;
use crate::nudge::{DeliveryRecord, NudgeAction, ScheduledNudge};

use super::{data_dir, ServiceState};

const KEY_SERVICE_STATE: &str = "nudgeServiceState";
const KEY_DAILY_COUNTER: &str = "nudge_notificationsDeliveredToday";
const KEY_SCHEDULED: &str = "nudgeScheduled";
const KEY_RESERVED_RANGES: &str = "nudgeReservedIdRanges";
const KEY_NEXT_ID: &str = "nudgeNextNotificationId";
const KEY_FLAG_EXPLANATION: &str = "showPermissionExplanation";
const KEY_FLAG_SETTINGS: &str = "showPermissionSettings";

/// Analytics counter families, persisted under `nudgeAnalytics_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsKind {
    Delivered,
    Viewed,
    Replayed,
    Saved,
    Dismissed,
}

impl AnalyticsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsKind::Delivered => "delivered",
            AnalyticsKind::Viewed => "viewed",
            AnalyticsKind::Replayed => "replayed",
            AnalyticsKind::Saved => "saved",
            AnalyticsKind::Dismissed => "dismissed",
        }
    }

    pub fn for_action(action: NudgeAction) -> Self {
        match action {
            NudgeAction::View => AnalyticsKind::Viewed,
            NudgeAction::Replay => AnalyticsKind::Replayed,
            NudgeAction::SaveMemory => AnalyticsKind::Saved,
            NudgeAction::Dismiss => AnalyticsKind::Dismissed,
        }
    }

    fn key(self) -> String {
        format!("nudgeAnalytics_{}", self.as_str())
    }
}

/// SQLite store for scheduler state and delivery records.
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    /// Open the store at `<data_dir>/carenudge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::DataDir(e.to_string()))?;
        Self::open_at(&dir.join("carenudge.db"))
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store
            .migrate()
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(store)
    }

    /// Open an in-memory store (tests, throwaway contexts).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store
            .migrate()
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS deliveries (
                notification_id INTEGER PRIMARY KEY,
                template_id     TEXT NOT NULL,
                delivered_at    TEXT NOT NULL,
                response        TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_deliveries_delivered_at
                ON deliveries(delivered_at);",
        )?;
        Ok(())
    }

    // ── Key-value layer ──────────────────────────────────────────────

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Read a JSON value. Malformed persisted JSON is logged and treated as
    /// absent state rather than propagated.
    fn json_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv_get(key)? {
            None => Ok(None),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(key, error = %e, "corrupt persisted value; treating as absent");
                    Ok(None)
                }
            },
        }
    }

    fn json_set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.kv_set(key, &raw)
    }

    // ── Scheduler state ──────────────────────────────────────────────

    pub fn service_state(&self) -> Result<Option<ServiceState>, StoreError> {
        self.json_get(KEY_SERVICE_STATE)
    }

    pub fn save_service_state(&self, state: &ServiceState) -> Result<(), StoreError> {
        self.json_set(KEY_SERVICE_STATE, state)
    }

    pub fn daily_counter(&self) -> Result<Option<DailyCounter>, StoreError> {
        self.json_get(KEY_DAILY_COUNTER)
    }

    pub fn save_daily_counter(&self, counter: &DailyCounter) -> Result<(), StoreError> {
        self.json_set(KEY_DAILY_COUNTER, counter)
    }

    pub fn scheduled_nudges(&self) -> Result<Vec<ScheduledNudge>, StoreError> {
        Ok(self.json_get(KEY_SCHEDULED)?.unwrap_or_default())
    }

    pub fn save_scheduled_nudges(&self, nudges: &[ScheduledNudge]) -> Result<(), StoreError> {
        self.json_set(KEY_SCHEDULED, &nudges)
    }

    pub fn reserved_ranges(&self) -> Result<Vec<ReservedIdRange>, StoreError> {
        Ok(self.json_get(KEY_RESERVED_RANGES)?.unwrap_or_default())
    }

    pub fn save_reserved_ranges(&self, ranges: &[ReservedIdRange]) -> Result<(), StoreError> {
        self.json_set(KEY_RESERVED_RANGES, &ranges)
    }

    pub fn allocator_cursor(&self) -> Result<Option<u32>, StoreError> {
        match self.kv_get(KEY_NEXT_ID)? {
            None => Ok(None),
            Some(raw) => match raw.parse() {
                Ok(cursor) => Ok(Some(cursor)),
                Err(_) => {
                    warn!(value = %raw, "corrupt allocator cursor; treating as absent");
                    Ok(None)
                }
            },
        }
    }

    pub fn save_allocator_cursor(&self, cursor: u32) -> Result<(), StoreError> {
        self.kv_set(KEY_NEXT_ID, &cursor.to_string())
    }

    // ── UI guidance flags ────────────────────────────────────────────

    pub fn show_permission_explanation(&self) -> Result<bool, StoreError> {
        Ok(self.kv_get(KEY_FLAG_EXPLANATION)?.as_deref() == Some("true"))
    }

    pub fn set_show_permission_explanation(&self, value: bool) -> Result<(), StoreError> {
        self.kv_set(KEY_FLAG_EXPLANATION, if value { "true" } else { "false" })
    }

    pub fn show_permission_settings(&self) -> Result<bool, StoreError> {
        Ok(self.kv_get(KEY_FLAG_SETTINGS)?.as_deref() == Some("true"))
    }

    pub fn set_show_permission_settings(&self, value: bool) -> Result<(), StoreError> {
        self.kv_set(KEY_FLAG_SETTINGS, if value { "true" } else { "false" })
    }

    // ── Analytics counters ───────────────────────────────────────────

    pub fn analytics_count(&self, kind: AnalyticsKind) -> Result<u64, StoreError> {
        match self.kv_get(&kind.key())? {
            None => Ok(0),
            Some(raw) => Ok(raw.parse().unwrap_or(0)),
        }
    }

    /// Atomic single-statement increment.
    pub fn increment_analytics(&self, kind: AnalyticsKind) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, '1')
             ON CONFLICT(key) DO UPDATE SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)",
            params![kind.key()],
        )?;
        Ok(())
    }

    // ── Delivery records ─────────────────────────────────────────────

    pub fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO deliveries (notification_id, template_id, delivered_at, response)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.notification_id,
                record.template_id,
                record.delivered_at.to_rfc3339(),
                record.response.map(|a| a.as_str()),
            ],
        )?;
        Ok(())
    }

    /// Record a response for a delivery. Returns `true` only for the first
    /// response; the `response IS NULL` guard makes later calls no-ops.
    pub fn set_response(&self, notification_id: u32, action: NudgeAction) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE deliveries SET response = ?2
             WHERE notification_id = ?1 AND response IS NULL",
            params![notification_id, action.as_str()],
        )?;
        Ok(changed == 1)
    }

    pub fn delivery(&self, notification_id: u32) -> Result<Option<DeliveryRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT template_id, delivered_at, response
                 FROM deliveries WHERE notification_id = ?1",
                params![notification_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((template_id, delivered_at, response)) = row else {
            return Ok(None);
        };
        let delivered_at = DateTime::parse_from_rfc3339(&delivered_at)
            .map_err(|e| StoreError::Corrupt {
                key: format!("deliveries/{notification_id}"),
                message: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Some(DeliveryRecord {
            notification_id,
            template_id,
            delivered_at,
            response: response.as_deref().and_then(NudgeAction::parse),
        }))
    }

    pub fn delivery_count(&self) -> Result<u64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM deliveries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Drop delivery records older than the retention cutoff. Returns the
    /// number of pruned rows.
    pub fn prune_deliveries_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM deliveries WHERE delivered_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: u32) -> DeliveryRecord {
        DeliveryRecord {
            notification_id: id,
            template_id: "tpl-1".into(),
            delivered_at: Utc::now(),
            response: None,
        }
    }

    #[test]
    fn kv_store() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.kv_get("test").unwrap().is_none());
        store.kv_set("test", "hello").unwrap();
        assert_eq!(store.kv_get("test").unwrap().unwrap(), "hello");
        store.kv_delete("test").unwrap();
        assert!(store.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn corrupt_json_reads_as_absent() {
        let store = StateStore::open_in_memory().unwrap();
        store.kv_set(KEY_SERVICE_STATE, "{not json").unwrap();
        assert!(store.service_state().unwrap().is_none());
        store.kv_set(KEY_NEXT_ID, "abc").unwrap();
        assert!(store.allocator_cursor().unwrap().is_none());
    }

    #[test]
    fn response_mutates_exactly_once() {
        let store = StateStore::open_in_memory().unwrap();
        store.record_delivery(&record(1001)).unwrap();

        assert!(store.set_response(1001, NudgeAction::View).unwrap());
        assert!(!store.set_response(1001, NudgeAction::Dismiss).unwrap());

        let stored = store.delivery(1001).unwrap().unwrap();
        assert_eq!(stored.response, Some(NudgeAction::View));
    }

    #[test]
    fn response_for_unknown_delivery_is_noop() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(!store.set_response(42, NudgeAction::View).unwrap());
    }

    #[test]
    fn analytics_increment() {
        let store = StateStore::open_in_memory().unwrap();
        assert_eq!(store.analytics_count(AnalyticsKind::Viewed).unwrap(), 0);
        store.increment_analytics(AnalyticsKind::Viewed).unwrap();
        store.increment_analytics(AnalyticsKind::Viewed).unwrap();
        assert_eq!(store.analytics_count(AnalyticsKind::Viewed).unwrap(), 2);
        assert_eq!(store.analytics_count(AnalyticsKind::Saved).unwrap(), 0);
    }

    #[test]
    fn prune_respects_cutoff() {
        let store = StateStore::open_in_memory().unwrap();
        let mut old = record(1);
        old.delivered_at = Utc::now() - Duration::days(40);
        store.record_delivery(&old).unwrap();
        store.record_delivery(&record(2)).unwrap();

        let removed = store
            .prune_deliveries_before(Utc::now() - Duration::days(30))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.delivery(1).unwrap().is_none());
        assert!(store.delivery(2).unwrap().is_some());
        assert_eq!(store.delivery_count().unwrap(), 1);
    }
}
