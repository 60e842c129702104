use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::SchedulerStatus;
use crate::nudge::NudgeAction;
use crate::window::TimeWindow;

/// Delivery and response events emitted by the engine. The UI and analytics
/// layers subscribe via the engine's broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeliveryEvent {
    NudgeScheduled {
        notification_id: u32,
        template_id: String,
        window: TimeWindow,
        deliver_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A nudge was displayed while the app was in the foreground.
    ReceivedForeground {
        notification_id: u32,
        template_id: String,
        at: DateTime<Utc>,
    },
    /// The user responded to a delivered nudge.
    Responded {
        notification_id: u32,
        template_id: String,
        action: NudgeAction,
        at: DateTime<Utc>,
    },
    StatusChanged {
        status: SchedulerStatus,
        at: DateTime<Utc>,
    },
    /// Stale persisted state was reconciled at startup.
    RecoveryCompleted {
        cancelled: usize,
        regenerated: usize,
        at: DateTime<Utc>,
    },
}
