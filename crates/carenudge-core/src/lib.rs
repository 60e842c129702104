//! # carenudge Core Library
//!
//! This library provides the nudge delivery and notification scheduling
//! core for carenudge, a therapeutic companion app for elderly users. It is
//! library-first: all operations are available through a standalone CLI
//! binary, with any GUI shell expected to be a thin layer over the same
//! core.
//!
//! ## Architecture
//!
//! - **Delivery Engine**: a permission-aware scheduler state machine behind
//!   a single async mutex; the caller drives it through explicit operations
//! - **Storage**: SQLite-based state store (key-value scheduler state plus
//!   delivery records), the single source of truth shared with background
//!   execution contexts
//! - **Collaborator boundaries**: content store, permission gate,
//!   notification transport, background scheduler, device probe, and audio
//!   player are traits wired in at construction
//!
//! ## Key Components
//!
//! - [`DeliveryEngine`]: scheduler lifecycle, daily cap, response routing
//! - [`StateStore`]: persistence and crash-recovery anchor
//! - [`IdAllocator`]: collision-free notification identifiers
//! - [`run_background_task`]: one-shot out-of-process entry point

pub mod audio;
pub mod background;
pub mod device;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod notify;
pub mod nudge;
pub mod permission;
pub mod settings;
pub mod storage;
pub mod window;

pub use audio::{AudioPlayer, PlaybackFidelity};
pub use background::{
    run_background_task, BackgroundRunOutcome, BackgroundScheduler, BackgroundTask,
    TaskConstraints, TaskDescriptor, TriggerRegistrar,
};
pub use device::{BatterySnapshot, BatteryState, DeviceConditionMonitor, DeviceProbe};
pub use engine::{
    counter::DailyCounter, DeliveryEngine, EngineConfig, EngineDeps, SchedulerStatus,
};
pub use error::{CoreError, NotifyError, Result, StoreError, ValidationError};
pub use events::DeliveryEvent;
pub use ids::{IdAllocator, ReservedIdRange};
pub use notify::{
    ChannelImportance, ChannelSpec, NotificationContent, NotificationDetails,
    NotificationTransport, ScheduleMatch,
};
pub use nudge::{
    ContentStore, DeliveryRecord, DeliveryTrigger, NudgeAction, NudgeCategory, NudgeTemplate,
    ResponsePayload, ScheduledNudge,
};
pub use permission::{PermissionGate, PermissionStatus};
pub use settings::{NotificationPrefs, QuietHoursPolicy, UserSettings};
pub use storage::{AnalyticsKind, ServiceState, StateStore};
pub use window::{
    next_delivery_instant, Clock, FixedClock, SystemClock, TimeWindow, TimeWindowCustomization,
    WindowHours,
};
