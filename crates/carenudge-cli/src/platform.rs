//! Desktop stand-ins for the platform collaborator boundaries, plus the
//! engine wiring used by every command.
//!
//! These adapters make the core drivable from a terminal: notifications
//! print as JSON lines, permission comes from CARENUDGE_PERMISSION, and
//! device conditions come from CARENUDGE_BATTERY / CARENUDGE_PLATFORM.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use carenudge_core::{
    AudioPlayer, BackgroundScheduler, BackgroundTask, BatteryState, ChannelSpec, DeliveryEngine,
    DeviceProbe, EngineConfig, EngineDeps, NotificationContent, NotificationDetails,
    NotificationTransport, NotifyError, PermissionGate, PermissionStatus, PlaybackFidelity,
    ScheduleMatch, StateStore, SystemClock, TaskConstraints,
};

use crate::content::TomlContentStore;

/// Permission gate driven by CARENUDGE_PERMISSION
/// (granted | denied | permanently_denied). Defaults to granted.
pub struct EnvPermissionGate;

impl EnvPermissionGate {
    fn read() -> PermissionStatus {
        match std::env::var("CARENUDGE_PERMISSION").as_deref() {
            Ok("denied") => PermissionStatus::Denied,
            Ok("permanently_denied") => PermissionStatus::PermanentlyDenied,
            _ => PermissionStatus::Granted,
        }
    }
}

impl PermissionGate for EnvPermissionGate {
    fn status(&self) -> PermissionStatus {
        Self::read()
    }

    fn request(&self) -> PermissionStatus {
        Self::read()
    }

    fn open_settings(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        println!("Open your OS notification settings to change permission for carenudge.");
        Ok(())
    }
}

/// Prints notifications as JSON lines instead of talking to an OS API.
pub struct ConsoleTransport;

impl NotificationTransport for ConsoleTransport {
    fn show(
        &self,
        id: u32,
        content: &NotificationContent,
        _details: &NotificationDetails,
    ) -> Result<(), NotifyError> {
        println!(
            "{}",
            serde_json::json!({
                "notification": "show",
                "id": id,
                "title": content.title,
                "body": content.body,
                "payload": content.payload,
            })
        );
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
        println!(
            "{}",
            serde_json::json!({
                "notification": "schedule",
                "id": id,
                "title": content.title,
                "at": at.to_rfc3339(),
                "payload": content.payload,
            })
        );
        Ok(())
    }

    fn cancel(&self, id: u32) -> Result<(), NotifyError> {
        info!(id, "cancelled notification");
        Ok(())
    }

    fn cancel_all(&self) -> Result<(), NotifyError> {
        info!("cancelled all notifications");
        Ok(())
    }

    fn register_channel(&self, channel: &ChannelSpec) -> Result<(), NotifyError> {
        info!(channel = %channel.id, "registered notification channel");
        Ok(())
    }
}

/// Battery and platform readings from the environment, with sane defaults
/// for a desktop shell.
pub struct EnvDeviceProbe;

impl DeviceProbe for EnvDeviceProbe {
    fn battery_level(&self) -> u8 {
        std::env::var("CARENUDGE_BATTERY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100)
    }

    fn battery_state(&self) -> BatteryState {
        match std::env::var("CARENUDGE_CHARGING").as_deref() {
            Ok("1") | Ok("true") => BatteryState::Charging,
            _ => BatteryState::Unknown,
        }
    }

    fn platform_version(&self) -> u32 {
        std::env::var("CARENUDGE_PLATFORM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(33)
    }
}

/// Logs playback instead of decoding audio.
pub struct LogAudioPlayer;

impl AudioPlayer for LogAudioPlayer {
    fn play(
        &self,
        url: &str,
        fidelity: PlaybackFidelity,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if url.is_empty() {
            // Clear caller bug; fail fast.
            return Err("empty audio url".into());
        }
        info!(url, ?fidelity, "audio playback");
        Ok(())
    }
}

/// Records task registrations in the log; a desktop shell has no OS task
/// scheduler to hand them to.
pub struct LogBackgroundRegistry;

impl BackgroundScheduler for LogBackgroundRegistry {
    fn register_periodic(
        &self,
        unique_name: &str,
        _task: BackgroundTask,
        frequency: std::time::Duration,
        constraints: &TaskConstraints,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            task = unique_name,
            frequency_secs = frequency.as_secs(),
            ?constraints,
            "registered background task"
        );
        Ok(())
    }
}

/// The full collaborator set for this process.
pub fn deps() -> Result<EngineDeps, Box<dyn std::error::Error>> {
    Ok(EngineDeps {
        store: StateStore::open()?,
        content: Arc::new(TomlContentStore::open()?),
        permission: Arc::new(EnvPermissionGate),
        transport: Arc::new(ConsoleTransport),
        audio: Arc::new(LogAudioPlayer),
        background: Arc::new(LogBackgroundRegistry),
        device: Arc::new(EnvDeviceProbe),
        clock: Arc::new(SystemClock),
    })
}

/// Wire an engine against fresh state.
pub fn build_engine() -> Result<DeliveryEngine, Box<dyn std::error::Error>> {
    Ok(DeliveryEngine::new(deps()?, EngineConfig::default())?)
}
