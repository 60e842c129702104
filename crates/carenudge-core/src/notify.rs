//! OS notification transport boundary.
//!
//! Platform adapters implement [`NotificationTransport`]. The engine builds
//! channel-aware details on modern platforms and a legacy fallback below the
//! channel floor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::settings::NotificationPrefs;

/// Channel used for all nudge notifications on channel-capable platforms.
pub const NUDGE_CHANNEL_ID: &str = "carenudge.nudges";

/// Visible notification content plus the response payload string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Wire-encoded `ResponsePayload`, round-tripped through the OS.
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelImportance {
    Default,
    High,
}

/// Notification channel registered once at initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: ChannelImportance,
}

/// Presentation details. `channel_id` is `None` in the legacy style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub channel_id: Option<String>,
    pub sound: Option<String>,
    pub vibration: bool,
}

impl NotificationDetails {
    pub fn for_channel(prefs: &NotificationPrefs) -> Self {
        Self {
            channel_id: Some(NUDGE_CHANNEL_ID.to_string()),
            sound: prefs.sound.clone(),
            vibration: prefs.vibration,
        }
    }

    /// Fallback style for platforms without notification channels.
    pub fn legacy(prefs: &NotificationPrefs) -> Self {
        Self {
            channel_id: None,
            sound: prefs.sound.clone(),
            vibration: prefs.vibration,
        }
    }
}

/// How a scheduled notification repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMatch {
    /// Fire once at the given instant.
    Exact,
    /// Repeat daily at the same local time.
    SameTimeDaily,
}

/// Platform notification adapters implement this trait.
pub trait NotificationTransport: Send + Sync {
    fn show(
        &self,
        id: u32,
        content: &NotificationContent,
        details: &NotificationDetails,
    ) -> Result<(), NotifyError>;

    fn zoned_schedule(
        &self,
        id: u32,
        content: &NotificationContent,
        at: DateTime<Utc>,
        details: &NotificationDetails,
        matching: ScheduleMatch,
    ) -> Result<(), NotifyError>;

    fn cancel(&self, id: u32) -> Result<(), NotifyError>;

    fn cancel_all(&self) -> Result<(), NotifyError>;

    /// Identifiers of notifications currently visible to the user.
    fn active_ids(&self) -> Vec<u32> {
        Vec::new()
    }

    fn register_channel(&self, _channel: &ChannelSpec) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// The single channel this engine registers on channel-capable platforms.
pub fn nudge_channel() -> ChannelSpec {
    ChannelSpec {
        id: NUDGE_CHANNEL_ID.to_string(),
        name: "Daily nudges".to_string(),
        description: "Gentle therapeutic prompts through the day".to_string(),
        importance: ChannelImportance::Default,
    }
}
