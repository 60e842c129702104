//! The nudge delivery engine.
//!
//! A permission-aware scheduler state machine. It owns the scheduler
//! lifecycle, decides whether/when to show or schedule a nudge, enforces
//! the daily cap, and routes user responses back into the system exactly
//! once.
//!
//! ## State transitions
//!
//! ```text
//! Uninitialized -> Initializing -> Ready
//!                               | PermissionDenied
//!                               | PermissionPermanentlyDenied
//!                               | Failed
//! ```
//!
//! `Ready` is the only state from which scheduling and display operations
//! succeed. All mutable state sits behind one async mutex; every operation
//! takes the lock once, which serializes OS callbacks against engine reads
//! and writes and collapses concurrent `initialize()` calls into a single
//! execution.

pub mod counter;
pub mod recovery;

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::audio::{AudioPlayer, PlaybackFidelity};
use crate::background::{BackgroundScheduler, TriggerRegistrar};
use crate::device::{DeviceConditionMonitor, DeviceProbe};
use crate::error::{CoreError, Result, StoreError};
use crate::events::DeliveryEvent;
use crate::ids::{self, IdAllocator};
use crate::notify::{
    nudge_channel, NotificationContent, NotificationDetails, NotificationTransport, ScheduleMatch,
};
use crate::nudge::{
    ContentStore, DeliveryRecord, DeliveryTrigger, NudgeAction, NudgeTemplate, ResponsePayload,
    ScheduledNudge,
};
use crate::permission::{PermissionGate, PermissionStatus};
use crate::settings::UserSettings;
use crate::storage::{AnalyticsKind, ServiceState, StateStore};
use crate::window::{next_delivery_instant, Clock, TimeWindow};

use counter::DailyCounter;
use recovery::{RecoveryAction, RecoveryReport};

/// Single authoritative scheduler state, owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerStatus {
    Uninitialized,
    Initializing,
    Ready,
    PermissionDenied,
    PermissionPermanentlyDenied,
    Failed,
}

impl SchedulerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerStatus::Uninitialized => "uninitialized",
            SchedulerStatus::Initializing => "initializing",
            SchedulerStatus::Ready => "ready",
            SchedulerStatus::PermissionDenied => "permissionDenied",
            SchedulerStatus::PermissionPermanentlyDenied => "permissionPermanentlyDenied",
            SchedulerStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minutes past window start at which a nudge is delivered.
    pub schedule_offset_min: i64,
    /// Battery percentage at or below which the reduced-fidelity path is used.
    pub low_battery_threshold: u8,
    /// Platform version below which the legacy notification style applies.
    pub channel_platform_floor: u32,
    /// Snapshot age beyond which persisted schedules are re-derived.
    pub staleness: Duration,
    /// Days of delivery records kept by the daily cleanup.
    pub retention_days: i64,
    /// Frequency of the device-unlock background check.
    pub unlock_check_frequency: std::time::Duration,
    /// Frequency of the cleanup background task.
    pub cleanup_frequency: std::time::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schedule_offset_min: 60,
            low_battery_threshold: 20,
            channel_platform_floor: 26,
            staleness: Duration::hours(6),
            retention_days: 30,
            unlock_check_frequency: std::time::Duration::from_secs(15 * 60),
            cleanup_frequency: std::time::Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Collaborators handed to the engine at construction. No global locator:
/// the application wires one instance explicitly.
pub struct EngineDeps {
    pub store: StateStore,
    pub content: Arc<dyn ContentStore>,
    pub permission: Arc<dyn PermissionGate>,
    pub transport: Arc<dyn NotificationTransport>,
    pub audio: Arc<dyn AudioPlayer>,
    pub background: Arc<dyn BackgroundScheduler>,
    pub device: Arc<dyn DeviceProbe>,
    pub clock: Arc<dyn Clock>,
}

struct Inner {
    status: SchedulerStatus,
    is_initialized: bool,
    store: StateStore,
    allocator: IdAllocator,
    scheduled: Vec<ScheduledNudge>,
    counter: DailyCounter,
    monitor: DeviceConditionMonitor,
}

/// The delivery engine. See the module docs for the state machine.
pub struct DeliveryEngine {
    inner: Mutex<Inner>,
    content: Arc<dyn ContentStore>,
    permission: Arc<dyn PermissionGate>,
    transport: Arc<dyn NotificationTransport>,
    audio: Arc<dyn AudioPlayer>,
    registrar: TriggerRegistrar,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    events: broadcast::Sender<DeliveryEvent>,
}

impl DeliveryEngine {
    /// Wire an engine against its collaborators. Loads the allocator
    /// cursor, reserved ranges, live schedules, and the daily counter from
    /// the store; does not touch permission or the OS until `initialize`.
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Result<Self> {
        let allocator = IdAllocator::load(&deps.store)?;
        let scheduled = deps.store.scheduled_nudges()?;
        let counter = deps
            .store
            .daily_counter()?
            .unwrap_or_else(|| DailyCounter::new(deps.clock.today_local()));
        let monitor = DeviceConditionMonitor::new(
            deps.device,
            config.low_battery_threshold,
            config.channel_platform_floor,
        );
        let registrar = TriggerRegistrar::new(
            deps.background,
            config.unlock_check_frequency,
            config.cleanup_frequency,
        );
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            inner: Mutex::new(Inner {
                status: SchedulerStatus::Uninitialized,
                is_initialized: false,
                store: deps.store,
                allocator,
                scheduled,
                counter,
                monitor,
            }),
            content: deps.content,
            permission: deps.permission,
            transport: deps.transport,
            audio: deps.audio,
            registrar,
            clock: deps.clock,
            config,
            events,
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Initialize the scheduler. Idempotent: concurrent calls collapse into
    /// a single execution and all callers observe the same terminal status.
    /// Returns whether the engine reached `Ready`.
    ///
    /// Permission denial is a status, not an error; only unexpected internal
    /// failures propagate, and those set `Failed` first so repeated calls
    /// return immediately instead of re-running the sequence.
    pub async fn initialize(&self) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.status != SchedulerStatus::Uninitialized {
            return Ok(inner.status == SchedulerStatus::Ready);
        }

        inner.status = SchedulerStatus::Initializing;
        match self.initialize_locked(inner) {
            Ok(status) => Ok(status == SchedulerStatus::Ready),
            Err(e) => {
                inner.status = SchedulerStatus::Failed;
                inner.is_initialized = false;
                if let Err(pe) = Self::persist_state(inner, self.clock.now_utc()) {
                    warn!(error = %pe, "failed to persist failed status");
                }
                error!(error = %e, "scheduler initialization failed");
                self.emit_status(SchedulerStatus::Failed);
                Err(e)
            }
        }
    }

    fn initialize_locked(&self, inner: &mut Inner) -> Result<SchedulerStatus> {
        let mut permission = self.permission.status();
        if permission == PermissionStatus::Denied {
            permission = self.permission.request();
        }
        let now = self.clock.now_utc();

        match permission {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                inner.status = SchedulerStatus::PermissionDenied;
                inner.is_initialized = false;
                inner.store.set_show_permission_explanation(true)?;
                Self::persist_state(inner, now)?;
                info!("notification permission denied; scheduler idle");
                self.emit_status(SchedulerStatus::PermissionDenied);
                return Ok(SchedulerStatus::PermissionDenied);
            }
            PermissionStatus::PermanentlyDenied => {
                inner.status = SchedulerStatus::PermissionPermanentlyDenied;
                inner.is_initialized = false;
                inner.store.set_show_permission_settings(true)?;
                Self::persist_state(inner, now)?;
                info!("notification permission permanently denied; scheduler idle");
                self.emit_status(SchedulerStatus::PermissionPermanentlyDenied);
                return Ok(SchedulerStatus::PermissionPermanentlyDenied);
            }
        }

        inner.store.set_show_permission_explanation(false)?;
        inner.store.set_show_permission_settings(false)?;

        if let Some(state) = inner.store.service_state()? {
            if state.is_stale(now, self.config.staleness) && !state.scheduled_nudge_ids.is_empty() {
                let report = self.reconcile_stale(inner, &state);
                info!(
                    examined = report.examined,
                    cancelled = report.cancelled,
                    regenerated = report.regenerated,
                    "recovered stale scheduler state"
                );
                let _ = self.events.send(DeliveryEvent::RecoveryCompleted {
                    cancelled: report.cancelled,
                    regenerated: report.regenerated,
                    at: now,
                });
            }
        }

        // Entries past their instant were either delivered or missed; they
        // are no longer live.
        inner.scheduled.retain(|s| s.scheduled_at > now);

        inner.counter.reset_if_new_day(self.clock.today_local());
        inner.monitor.refresh();

        if inner.monitor.supports_modern_channels() {
            self.transport.register_channel(&nudge_channel())?;
        }
        self.registrar
            .register_device_unlock_trigger(inner.monitor.is_low_battery())?;

        inner.status = SchedulerStatus::Ready;
        inner.is_initialized = true;
        Self::persist_state(inner, now)?;
        info!("scheduler ready");
        self.emit_status(SchedulerStatus::Ready);
        Ok(SchedulerStatus::Ready)
    }

    /// Cancel every persisted schedule and regenerate from active templates
    /// for windows still due today.
    fn reconcile_stale(&self, inner: &mut Inner, state: &ServiceState) -> RecoveryReport {
        let mut report = RecoveryReport::new(state.scheduled_nudge_ids.len());

        for &id in &state.scheduled_nudge_ids {
            if let Err(e) = self.transport.cancel(id) {
                warn!(notification_id = id, error = %e, "cancel of stale notification failed");
            }
            report.note(RecoveryAction::Cancelled {
                notification_id: id,
            });
        }
        inner.scheduled.clear();

        let settings = self.settings();
        for window in TimeWindow::ALL {
            if !settings.window_enabled(window) {
                report.note(RecoveryAction::Skipped {
                    window,
                    reason: "window disabled".to_string(),
                });
                continue;
            }
            let hours = settings.hours_for(window);
            if !crate::window::due_today(
                self.clock.as_ref(),
                &hours,
                self.config.schedule_offset_min,
            ) {
                report.note(RecoveryAction::Skipped {
                    window,
                    reason: "no longer due today".to_string(),
                });
                continue;
            }
            let Some(template) = self
                .content
                .random_for_window(window, settings.enabled_categories.as_deref())
            else {
                report.note(RecoveryAction::Skipped {
                    window,
                    reason: "no active template".to_string(),
                });
                continue;
            };
            match self.schedule_locked(inner, &settings, &template, window) {
                Ok(nudge) => report.note(RecoveryAction::Regenerated {
                    window,
                    notification_id: nudge.notification_id,
                }),
                Err(e) => {
                    warn!(window = %window, error = %e, "failed to regenerate schedule");
                    report.note(RecoveryAction::Skipped {
                        window,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Foreground-resume hook: refresh the battery snapshot and pick up a
    /// permission grant made in OS settings since the denial.
    pub async fn on_foreground_resume(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner.monitor.refresh();

        if inner.status == SchedulerStatus::PermissionDenied
            && self.permission.status() == PermissionStatus::Granted
        {
            info!("permission granted in settings; re-initializing scheduler");
            inner.status = SchedulerStatus::Initializing;
            if let Err(e) = self.initialize_locked(inner) {
                inner.status = SchedulerStatus::Failed;
                error!(error = %e, "re-initialization after permission grant failed");
                self.emit_status(SchedulerStatus::Failed);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Background/terminate hook: persist the snapshot synchronously. This
    /// is the sole recovery anchor used at the next `initialize()`.
    pub async fn on_suspend(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Err(e) = Self::persist_state(inner, self.clock.now_utc()) {
            error!(error = %e, "failed to persist state on suspend");
        }
    }

    // ── Scheduling & display ─────────────────────────────────────────

    /// Schedule a nudge for a time window. Returns `false` on any failure
    /// (engine not ready, inactive template, transport error); scheduling
    /// must never crash the caller.
    pub async fn schedule_nudge_for_time_window(
        &self,
        template: &NudgeTemplate,
        window: TimeWindow,
    ) -> bool {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.status != SchedulerStatus::Ready {
            warn!(status = %inner.status, "schedule request while not ready");
            return false;
        }
        let settings = self.settings();
        if !self.schedulable(&settings, template) {
            return false;
        }
        if !settings.window_enabled(window) {
            debug!(window = %window, "window disabled in settings");
            return false;
        }
        match self.schedule_locked(inner, &settings, template, window) {
            Ok(nudge) => {
                info!(
                    notification_id = nudge.notification_id,
                    template = %template.id,
                    window = %window,
                    deliver_at = %nudge.scheduled_at,
                    "nudge scheduled"
                );
                true
            }
            Err(e) => {
                warn!(template = %template.id, window = %window, error = %e, "failed to schedule nudge");
                false
            }
        }
    }

    /// Schedule one nudge per enabled window and register the daily cleanup
    /// task. Returns the number of windows scheduled.
    pub async fn schedule_time_based_nudges(&self) -> Result<usize> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.status != SchedulerStatus::Ready {
            warn!(status = %inner.status, "schedule request while not ready");
            return Ok(0);
        }

        let settings = self.settings();
        let mut scheduled = 0;
        for window in TimeWindow::ALL {
            if !settings.window_enabled(window) {
                continue;
            }
            let Some(template) = self
                .content
                .random_for_window(window, settings.enabled_categories.as_deref())
            else {
                debug!(window = %window, "no active template for window");
                continue;
            };
            match self.schedule_locked(inner, &settings, &template, window) {
                Ok(_) => scheduled += 1,
                Err(e) => warn!(window = %window, error = %e, "failed to schedule nudge"),
            }
        }

        self.registrar
            .register_daily_cleanup(inner.monitor.is_low_battery())?;
        Ok(scheduled)
    }

    fn schedule_locked(
        &self,
        inner: &mut Inner,
        settings: &UserSettings,
        template: &NudgeTemplate,
        window: TimeWindow,
    ) -> Result<ScheduledNudge> {
        let hours = settings.hours_for(window);
        let deliver_at =
            next_delivery_instant(self.clock.as_ref(), &hours, self.config.schedule_offset_min)
                .ok_or_else(|| {
                    CoreError::Custom(format!("unresolvable hours for window {window}"))
                })?;

        // A fresh schedule for the same window supersedes the old one; the
        // stale OS notification must go before its replacement exists.
        if let Some(pos) = inner
            .scheduled
            .iter()
            .position(|s| s.trigger == DeliveryTrigger::Window { window })
        {
            let old = inner.scheduled.remove(pos);
            if let Err(e) = self.transport.cancel(old.notification_id) {
                warn!(notification_id = old.notification_id, error = %e, "cancel of superseded notification failed");
            }
        }

        let live: Vec<u32> = inner.scheduled.iter().map(|s| s.notification_id).collect();
        let id = inner.allocator.allocate(&inner.store, &live)?;
        let payload = ResponsePayload::new(&template.id, NudgeAction::View).encode();
        let content = NotificationContent {
            title: template.title.clone(),
            body: template.body.clone(),
            payload: payload.clone(),
        };
        let details = Self::details_for(&inner.monitor, settings);
        self.transport
            .zoned_schedule(id, &content, deliver_at, &details, ScheduleMatch::Exact)?;

        let nudge = ScheduledNudge {
            notification_id: id,
            template_id: template.id.clone(),
            trigger: DeliveryTrigger::Window { window },
            scheduled_at: deliver_at,
            payload,
        };
        inner.scheduled.push(nudge.clone());
        Self::persist_state(inner, self.clock.now_utc())?;
        let _ = self.events.send(DeliveryEvent::NudgeScheduled {
            notification_id: id,
            template_id: template.id.clone(),
            window,
            deliver_at,
            at: self.clock.now_utc(),
        });
        Ok(nudge)
    }

    /// Show a nudge right now, on a device-unlock trigger. Returns `false`
    /// when the engine is not ready, the daily cap is reached, quiet hours
    /// apply, or another nudge notification is still visible. The cap check
    /// and increment share one critical section with the day-boundary
    /// reset.
    pub async fn show_device_unlock_nudge(&self, template: &NudgeTemplate) -> bool {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if inner.status != SchedulerStatus::Ready {
            debug!(status = %inner.status, "unlock nudge while not ready");
            return false;
        }
        let settings = self.settings();
        if !self.schedulable(&settings, template) {
            return false;
        }
        if settings.quiet_hours.contains(self.clock.now_local().hour()) {
            debug!("quiet hours; suppressing unlock nudge");
            return false;
        }

        inner.counter.reset_if_new_day(self.clock.today_local());
        if inner.counter.count >= settings.daily_max {
            debug!(
                count = inner.counter.count,
                max = settings.daily_max,
                "daily cap reached"
            );
            return false;
        }

        // Don't stack nudges: skip while one of ours is still visible.
        let conflicting = self
            .transport
            .active_ids()
            .into_iter()
            .any(|id| ids::in_band(id) && !inner.allocator.is_reserved(id));
        if conflicting {
            debug!("another nudge notification is active; skipping");
            return false;
        }

        inner.monitor.refresh();
        let fidelity = if inner.monitor.is_low_battery() {
            debug!("low battery; using reduced audio fidelity");
            PlaybackFidelity::Reduced
        } else {
            PlaybackFidelity::Full
        };

        let live: Vec<u32> = inner.scheduled.iter().map(|s| s.notification_id).collect();
        let id = match inner.allocator.allocate(&inner.store, &live) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "identifier allocation failed");
                return false;
            }
        };
        let payload = ResponsePayload::new(&template.id, NudgeAction::View).encode();
        let content = NotificationContent {
            title: template.title.clone(),
            body: template.body.clone(),
            payload,
        };
        let details = Self::details_for(&inner.monitor, &settings);
        if let Err(e) = self.transport.show(id, &content, &details) {
            warn!(template = %template.id, error = %e, "notification transport failed");
            return false;
        }

        inner.counter.increment();
        let now = self.clock.now_utc();
        let record = DeliveryRecord {
            notification_id: id,
            template_id: template.id.clone(),
            delivered_at: now,
            response: None,
        };
        if let Err(e) = inner.store.record_delivery(&record) {
            warn!(notification_id = id, error = %e, "failed to persist delivery record");
        }
        if let Err(e) = inner.store.increment_analytics(AnalyticsKind::Delivered) {
            warn!(error = %e, "failed to bump delivered counter");
        }
        if let Err(e) = Self::persist_state(inner, now) {
            warn!(error = %e, "failed to persist state after delivery");
        }

        // Audio is best-effort: the notification is already on screen.
        if let Some(url) = template.audio_url.as_deref() {
            if url.is_empty() {
                warn!(template = %template.id, "template carries an empty audio url");
            } else if let Err(e) = self.audio.play(url, fidelity) {
                warn!(template = %template.id, error = %e, "audio playback failed; nudge shown without audio");
            }
        }

        info!(notification_id = id, template = %template.id, "unlock nudge delivered");
        let _ = self.events.send(DeliveryEvent::ReceivedForeground {
            notification_id: id,
            template_id: template.id.clone(),
            at: now,
        });
        true
    }

    fn schedulable(&self, settings: &UserSettings, template: &NudgeTemplate) -> bool {
        if !template.is_active {
            warn!(template = %template.id, "template is inactive");
            return false;
        }
        if template.id.is_empty() || !template.id.is_ascii() || template.id.contains(':') {
            warn!(template = %template.id, "template id not payload-safe");
            return false;
        }
        if !settings.notifications.enabled {
            debug!("notifications disabled in settings");
            return false;
        }
        true
    }

    // ── Response routing ─────────────────────────────────────────────

    /// Route a user response callback. Dispatches the follow-up for the
    /// action and bumps its analytics counter exactly once per notification
    /// id; duplicates and unparseable payloads are logged no-ops. Returns
    /// whether the response was applied.
    pub async fn handle_response(&self, notification_id: u32, raw_payload: &str) -> bool {
        let Some(payload) = ResponsePayload::decode(raw_payload) else {
            warn!(notification_id, payload = raw_payload, "unparseable response payload");
            return false;
        };

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let now = self.clock.now_utc();

        let first = match inner.store.delivery(notification_id) {
            // Scheduled deliveries surface here first when the OS showed
            // them out of process; create the record on first sight.
            Ok(None) => {
                let record = DeliveryRecord {
                    notification_id,
                    template_id: payload.template_id.clone(),
                    delivered_at: now,
                    response: Some(payload.action),
                };
                if let Err(e) = inner.store.record_delivery(&record) {
                    warn!(notification_id, error = %e, "failed to persist delivery record");
                    return false;
                }
                if let Err(e) = inner.store.increment_analytics(AnalyticsKind::Delivered) {
                    warn!(error = %e, "failed to bump delivered counter");
                }
                true
            }
            Ok(Some(_)) => match inner.store.set_response(notification_id, payload.action) {
                Ok(first) => first,
                Err(e) => {
                    warn!(notification_id, error = %e, "failed to record response");
                    return false;
                }
            },
            Err(e) => {
                warn!(notification_id, error = %e, "failed to load delivery record");
                return false;
            }
        };

        if !first {
            debug!(notification_id, "duplicate response ignored");
            return false;
        }

        if let Err(e) = inner
            .store
            .increment_analytics(AnalyticsKind::for_action(payload.action))
        {
            warn!(error = %e, "failed to bump response counter");
        }

        match payload.action {
            NudgeAction::View | NudgeAction::Dismiss => {}
            NudgeAction::Replay => {
                match self.content.template_by_id(&payload.template_id) {
                    Some(template) => match template.audio_url.as_deref() {
                        Some(url) if !url.is_empty() => {
                            if let Err(e) = self.audio.play(url, PlaybackFidelity::Full) {
                                warn!(template = %payload.template_id, error = %e, "replay failed");
                            }
                        }
                        _ => debug!(template = %payload.template_id, "replay requested for silent template"),
                    },
                    None => {
                        warn!(template = %payload.template_id, "replay requested for unknown template")
                    }
                }
            }
            NudgeAction::SaveMemory => {
                if let Err(e) = self.content.save_memory(&payload.template_id) {
                    warn!(template = %payload.template_id, error = %e, "save-memory forwarding failed");
                }
            }
        }

        // The notification is consumed; drop it from the live set.
        if let Some(pos) = inner
            .scheduled
            .iter()
            .position(|s| s.notification_id == notification_id)
        {
            inner.scheduled.remove(pos);
            if let Err(e) = Self::persist_state(inner, now) {
                warn!(error = %e, "failed to persist state after response");
            }
        }

        let _ = self.events.send(DeliveryEvent::Responded {
            notification_id,
            template_id: payload.template_id.clone(),
            action: payload.action,
            at: now,
        });
        true
    }

    // ── Maintenance ──────────────────────────────────────────────────

    /// Prune delivery records beyond the retention window. Runs regardless
    /// of scheduler status; it only touches durable storage.
    pub async fn run_daily_cleanup(&self) -> Result<usize> {
        let guard = self.inner.lock().await;
        let cutoff = self.clock.now_utc() - Duration::days(self.config.retention_days);
        let removed = guard.store.prune_deliveries_before(cutoff)?;
        if removed > 0 {
            info!(removed, "pruned delivery records beyond retention");
        }
        Ok(removed)
    }

    /// Reserve an identifier band for an external producer sharing the
    /// notification id space. Idempotent.
    pub async fn register_reserved_id_range(
        &self,
        start: u32,
        end: u32,
        owner: &str,
    ) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        inner
            .allocator
            .register_reserved_range(&inner.store, start, end, owner)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn status(&self) -> SchedulerStatus {
        self.inner.lock().await.status
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.lock().await.is_initialized
    }

    /// Whether the UI should show the one-time permission explanation.
    pub async fn needs_permission_explanation(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.store.show_permission_explanation().unwrap_or(false)
    }

    /// Whether the UI should guide the user to OS notification settings.
    pub async fn needs_permission_settings_guidance(&self) -> bool {
        let guard = self.inner.lock().await;
        guard.store.show_permission_settings().unwrap_or(false)
    }

    pub fn open_notification_settings(&self) -> Result<()> {
        self.permission
            .open_settings()
            .map_err(|e| CoreError::Custom(format!("failed to open notification settings: {e}")))
    }

    /// Subscribe to delivery/response events.
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    pub async fn scheduled_nudges(&self) -> Vec<ScheduledNudge> {
        self.inner.lock().await.scheduled.clone()
    }

    pub async fn delivered_today(&self) -> u32 {
        let mut guard = self.inner.lock().await;
        let today = self.clock.today_local();
        guard.counter.reset_if_new_day(today);
        guard.counter.count
    }

    pub async fn analytics_count(&self, kind: AnalyticsKind) -> Result<u64> {
        let guard = self.inner.lock().await;
        Ok(guard.store.analytics_count(kind)?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn settings(&self) -> UserSettings {
        self.content.user_settings().unwrap_or_default()
    }

    fn details_for(monitor: &DeviceConditionMonitor, settings: &UserSettings) -> NotificationDetails {
        if monitor.supports_modern_channels() {
            NotificationDetails::for_channel(&settings.notifications)
        } else {
            NotificationDetails::legacy(&settings.notifications)
        }
    }

    fn emit_status(&self, status: SchedulerStatus) {
        let _ = self.events.send(DeliveryEvent::StatusChanged {
            status,
            at: self.clock.now_utc(),
        });
    }

    /// Write the full snapshot: service state, live schedules, and the
    /// daily counter. `saved_timestamp` reflects this mutation.
    fn persist_state(inner: &Inner, now: DateTime<Utc>) -> Result<(), StoreError> {
        let state = ServiceState {
            is_initialized: inner.is_initialized,
            status: inner.status,
            scheduled_nudge_ids: inner.scheduled.iter().map(|s| s.notification_id).collect(),
            notifications_delivered_today: inner.counter.count,
            last_delivery_date: Some(inner.counter.date),
            saved_timestamp: now,
        };
        inner.store.save_service_state(&state)?;
        inner.store.save_scheduled_nudges(&inner.scheduled)?;
        inner.store.save_daily_counter(&inner.counter)?;
        Ok(())
    }
}
