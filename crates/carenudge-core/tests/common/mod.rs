//! Shared mock collaborators for engine integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use carenudge_core::{
    AudioPlayer, BackgroundScheduler, BackgroundTask, BatteryState, Clock, ContentStore,
    DeliveryEngine, DeviceProbe, EngineConfig, EngineDeps, FixedClock, NotificationContent,
    NotificationDetails, NotificationTransport, NotifyError, NudgeCategory, NudgeTemplate,
    PermissionGate, PermissionStatus, PlaybackFidelity, ScheduleMatch, StateStore,
    TaskConstraints, TimeWindow, UserSettings,
};

pub struct MockPermission {
    status: Mutex<PermissionStatus>,
    after_request: Mutex<Option<PermissionStatus>>,
    pub status_calls: AtomicUsize,
    pub request_calls: AtomicUsize,
}

impl MockPermission {
    pub fn with_status(status: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            after_request: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::with_status(PermissionStatus::Granted)
    }

    pub fn denied() -> Self {
        Self::with_status(PermissionStatus::Denied)
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Make `request()` flip the status (the user accepted the prompt).
    pub fn grant_on_request(&self) {
        *self.after_request.lock().unwrap() = Some(PermissionStatus::Granted);
    }
}

impl PermissionGate for MockPermission {
    fn status(&self) -> PermissionStatus {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        *self.status.lock().unwrap()
    }

    fn request(&self) -> PermissionStatus {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = *self.after_request.lock().unwrap() {
            *self.status.lock().unwrap() = next;
        }
        *self.status.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MockTransport {
    pub shown: Mutex<Vec<(u32, NotificationContent)>>,
    pub scheduled: Mutex<Vec<(u32, NotificationContent, DateTime<Utc>)>>,
    pub cancelled: Mutex<Vec<u32>>,
    pub active: Mutex<Vec<u32>>,
    pub channels: Mutex<Vec<String>>,
    pub fail_show: AtomicBool,
    pub fail_schedule: AtomicBool,
}

impl MockTransport {
    pub fn shown_ids(&self) -> Vec<u32> {
        self.shown.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn scheduled_ids(&self) -> Vec<u32> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _, _)| *id)
            .collect()
    }
}

impl NotificationTransport for MockTransport {
    fn show(
        &self,
        id: u32,
        content: &NotificationContent,
        _details: &NotificationDetails,
    ) -> Result<(), NotifyError> {
        if self.fail_show.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("show rejected".into()));
        }
        self.shown.lock().unwrap().push((id, content.clone()));
        Ok(())
    }

    fn zoned_schedule(
        &self,
        id: u32,
        content: &NotificationContent,
        at: DateTime<Utc>,
        _details: &NotificationDetails,
        _matching: ScheduleMatch,
    ) -> Result<(), NotifyError> {
        if self.fail_schedule.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("schedule rejected".into()));
        }
        self.scheduled.lock().unwrap().push((id, content.clone(), at));
        Ok(())
    }

    fn cancel(&self, id: u32) -> Result<(), NotifyError> {
        self.cancelled.lock().unwrap().push(id);
        self.scheduled.lock().unwrap().retain(|(sid, _, _)| *sid != id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotifyError> {
        self.scheduled.lock().unwrap().clear();
        Ok(())
    }

    fn active_ids(&self) -> Vec<u32> {
        self.active.lock().unwrap().clone()
    }

    fn register_channel(
        &self,
        channel: &carenudge_core::ChannelSpec,
    ) -> Result<(), NotifyError> {
        self.channels.lock().unwrap().push(channel.id.clone());
        Ok(())
    }
}

pub struct MockContent {
    templates: Mutex<Vec<NudgeTemplate>>,
    settings: Mutex<UserSettings>,
    pub saved: Mutex<Vec<String>>,
}

impl MockContent {
    pub fn with_defaults() -> Self {
        Self {
            templates: Mutex::new(vec![
                template("tpl-calm-01", Some("https://cdn.example/calm.ogg")),
                template("tpl-grat-02", None),
            ]),
            settings: Mutex::new(UserSettings::default()),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn set_settings(&self, settings: UserSettings) {
        *self.settings.lock().unwrap() = settings;
    }

    pub fn set_templates(&self, templates: Vec<NudgeTemplate>) {
        *self.templates.lock().unwrap() = templates;
    }
}

impl ContentStore for MockContent {
    fn template_by_id(&self, id: &str) -> Option<NudgeTemplate> {
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    fn random_for_window(
        &self,
        _window: TimeWindow,
        categories: Option<&[NudgeCategory]>,
    ) -> Option<NudgeTemplate> {
        self.templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| {
                t.is_active
                    && categories
                        .map(|cats| cats.contains(&t.category))
                        .unwrap_or(true)
            })
            .cloned()
    }

    fn user_settings(&self) -> Option<UserSettings> {
        Some(self.settings.lock().unwrap().clone())
    }

    fn save_memory(
        &self,
        template_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.saved.lock().unwrap().push(template_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockAudio {
    pub plays: Mutex<Vec<(String, PlaybackFidelity)>>,
    pub fail: AtomicBool,
}

impl AudioPlayer for MockAudio {
    fn play(
        &self,
        url: &str,
        fidelity: PlaybackFidelity,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("decoder unavailable".into());
        }
        self.plays.lock().unwrap().push((url.to_string(), fidelity));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockBackground {
    pub registered: Mutex<Vec<(String, TaskConstraints)>>,
    pub fail: AtomicBool,
}

impl BackgroundScheduler for MockBackground {
    fn register_periodic(
        &self,
        unique_name: &str,
        _task: BackgroundTask,
        _frequency: std::time::Duration,
        constraints: &TaskConstraints,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("task registry unavailable".into());
        }
        self.registered
            .lock()
            .unwrap()
            .push((unique_name.to_string(), *constraints));
        Ok(())
    }
}

pub struct MockProbe {
    pub level: AtomicU8,
    pub charging: AtomicBool,
    pub version: u32,
}

impl MockProbe {
    pub fn healthy() -> Self {
        Self {
            level: AtomicU8::new(90),
            charging: AtomicBool::new(false),
            version: 33,
        }
    }
}

impl DeviceProbe for MockProbe {
    fn battery_level(&self) -> u8 {
        self.level.load(Ordering::SeqCst)
    }

    fn battery_state(&self) -> BatteryState {
        if self.charging.load(Ordering::SeqCst) {
            BatteryState::Charging
        } else {
            BatteryState::Discharging
        }
    }

    fn platform_version(&self) -> u32 {
        self.version
    }
}

/// Fixed local time at UTC+2 on 2026-03-10.
pub fn clock_at(hour: u32, min: u32) -> FixedClock {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let local = offset.with_ymd_and_hms(2026, 3, 10, hour, min, 0).unwrap();
    FixedClock {
        now: local.with_timezone(&Utc),
        offset,
    }
}

pub fn template(id: &str, audio_url: Option<&str>) -> NudgeTemplate {
    NudgeTemplate {
        id: id.to_string(),
        title: "A gentle moment".to_string(),
        body: "Take a slow breath and notice the room around you.".to_string(),
        category: NudgeCategory::Calming,
        audio_url: audio_url.map(str::to_string),
        is_active: true,
    }
}

/// Everything an engine needs, with handles kept for assertions.
pub struct TestBed {
    pub permission: Arc<MockPermission>,
    pub transport: Arc<MockTransport>,
    pub content: Arc<MockContent>,
    pub audio: Arc<MockAudio>,
    pub background: Arc<MockBackground>,
    pub probe: Arc<MockProbe>,
    pub clock: Arc<FixedClock>,
}

impl TestBed {
    pub fn at(hour: u32, min: u32) -> Self {
        Self {
            permission: Arc::new(MockPermission::granted()),
            transport: Arc::new(MockTransport::default()),
            content: Arc::new(MockContent::with_defaults()),
            audio: Arc::new(MockAudio::default()),
            background: Arc::new(MockBackground::default()),
            probe: Arc::new(MockProbe::healthy()),
            clock: Arc::new(clock_at(hour, min)),
        }
    }

    pub fn new() -> Self {
        Self::at(9, 0)
    }

    pub fn deps(&self, store: StateStore) -> EngineDeps {
        EngineDeps {
            store,
            content: self.content.clone(),
            permission: self.permission.clone(),
            transport: self.transport.clone(),
            audio: self.audio.clone(),
            background: self.background.clone(),
            device: self.probe.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn engine(&self, store: StateStore) -> DeliveryEngine {
        DeliveryEngine::new(self.deps(store), EngineConfig::default()).unwrap()
    }

    pub fn engine_in_memory(&self) -> DeliveryEngine {
        self.engine(StateStore::open_in_memory().unwrap())
    }
}

/// The user's local wall-clock rendering of an instant, for assertions.
pub fn local_hm(clock: &FixedClock, at: DateTime<Utc>) -> String {
    at.with_timezone(&clock.offset).format("%d %H:%M").to_string()
}
