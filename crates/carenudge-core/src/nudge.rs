//! Nudge domain types, the response payload wire codec, and the content
//! collaborator boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::UserSettings;
use crate::window::TimeWindow;

/// Template categories, as curated by the content backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeCategory {
    Calming,
    Gratitude,
    Memory,
    Movement,
    Connection,
}

/// A nudge template supplied by the content collaborator. Consumed
/// read-only; only active templates may be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeTemplate {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: NudgeCategory,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// User response actions carried in the notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeAction {
    View,
    Replay,
    SaveMemory,
    Dismiss,
}

impl NudgeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            NudgeAction::View => "view",
            NudgeAction::Replay => "replay",
            NudgeAction::SaveMemory => "save_memory",
            NudgeAction::Dismiss => "dismiss",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(NudgeAction::View),
            "replay" => Some(NudgeAction::Replay),
            "save_memory" => Some(NudgeAction::SaveMemory),
            "dismiss" => Some(NudgeAction::Dismiss),
            _ => None,
        }
    }
}

/// Tagged form of the notification payload.
///
/// The string encoding `"<templateId>:<action>"` exists only at the OS
/// notification boundary; everything inside the engine works with this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub template_id: String,
    pub action: NudgeAction,
}

impl ResponsePayload {
    pub fn new(template_id: &str, action: NudgeAction) -> Self {
        Self {
            template_id: template_id.to_string(),
            action,
        }
    }

    /// Wire encoding. Template ids are ASCII without colons, so the result
    /// round-trips through the OS payload field.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.template_id, self.action.as_str())
    }

    /// Parse the wire form. Returns `None` for anything malformed; callers
    /// log and no-op.
    pub fn decode(raw: &str) -> Option<Self> {
        let (template_id, action) = raw.split_once(':')?;
        if template_id.is_empty() || !template_id.is_ascii() || action.contains(':') {
            return None;
        }
        Some(Self {
            template_id: template_id.to_string(),
            action: NudgeAction::parse(action)?,
        })
    }
}

/// What caused (or will cause) a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryTrigger {
    Window { window: TimeWindow },
    DeviceUnlock,
}

/// An in-flight scheduled notification. Removed when delivered, cancelled,
/// or superseded; no two live entries share a `notification_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNudge {
    pub notification_id: u32,
    pub template_id: String,
    pub trigger: DeliveryTrigger,
    pub scheduled_at: DateTime<Utc>,
    pub payload: String,
}

/// Record of a delivery, created at display time. The response field is
/// written at most once; a second response for the same id is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub notification_id: u32,
    pub template_id: String,
    pub delivered_at: DateTime<Utc>,
    pub response: Option<NudgeAction>,
}

/// The template/content backend, consumed at its interface boundary only.
pub trait ContentStore: Send + Sync {
    fn template_by_id(&self, id: &str) -> Option<NudgeTemplate>;

    fn random_for_window(
        &self,
        window: TimeWindow,
        categories: Option<&[NudgeCategory]>,
    ) -> Option<NudgeTemplate>;

    fn user_settings(&self) -> Option<UserSettings>;

    /// Forward a "save this to my memories" request to the content backend.
    fn save_memory(&self, template_id: &str)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trip() {
        let payload = ResponsePayload::new("tpl-breathing-01", NudgeAction::SaveMemory);
        let wire = payload.encode();
        assert_eq!(wire, "tpl-breathing-01:save_memory");
        assert_eq!(ResponsePayload::decode(&wire).unwrap(), payload);
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(ResponsePayload::decode("").is_none());
        assert!(ResponsePayload::decode("no-separator").is_none());
        assert!(ResponsePayload::decode(":view").is_none());
        assert!(ResponsePayload::decode("tpl:open").is_none());
        assert!(ResponsePayload::decode("tpl:view:extra").is_none());
    }

    #[test]
    fn decode_takes_first_colon_as_separator() {
        // An embedded colon would shift the action token; that must fail
        // rather than misroute.
        assert!(ResponsePayload::decode("tpl:1:view").is_none());
    }
}
