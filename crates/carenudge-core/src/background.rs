//! Background trigger registration and out-of-process task entry.
//!
//! Background execution shares no memory with the foreground instance. The
//! entry point receives a serialized [`TaskDescriptor`], builds an engine
//! against fresh durable state, performs one bounded operation, and
//! returns.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::{DeliveryEngine, EngineConfig, EngineDeps, SchedulerStatus};
use crate::error::{CoreError, Result};

/// Recurring tasks this engine registers with the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundTask {
    DeviceUnlockCheck,
    DailyCleanup,
}

impl BackgroundTask {
    pub fn task_name(self) -> &'static str {
        match self {
            BackgroundTask::DeviceUnlockCheck => "deviceUnlockCheck",
            BackgroundTask::DailyCleanup => "dailyCleanup",
        }
    }
}

/// Execution constraints passed to the OS task scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConstraints {
    pub battery_not_low: bool,
    pub requires_charging: bool,
    pub requires_network: bool,
}

impl TaskConstraints {
    /// Default constraints for routine checks.
    pub fn relaxed() -> Self {
        Self {
            battery_not_low: false,
            requires_charging: false,
            requires_network: false,
        }
    }

    /// Tightened constraints while the device reports low battery.
    pub fn strict() -> Self {
        Self {
            battery_not_low: true,
            requires_charging: true,
            requires_network: false,
        }
    }
}

/// OS background task subsystem boundary.
pub trait BackgroundScheduler: Send + Sync {
    fn register_periodic(
        &self,
        unique_name: &str,
        task: BackgroundTask,
        frequency: Duration,
        constraints: &TaskConstraints,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn cancel(&self, unique_name: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = unique_name;
        Ok(())
    }
}

/// Registers the engine's recurring tasks, tightening constraints on low
/// battery.
pub struct TriggerRegistrar {
    scheduler: Arc<dyn BackgroundScheduler>,
    unlock_frequency: Duration,
    cleanup_frequency: Duration,
}

impl TriggerRegistrar {
    pub fn new(
        scheduler: Arc<dyn BackgroundScheduler>,
        unlock_frequency: Duration,
        cleanup_frequency: Duration,
    ) -> Self {
        Self {
            scheduler,
            unlock_frequency,
            cleanup_frequency,
        }
    }

    pub fn register_device_unlock_trigger(&self, low_battery: bool) -> Result<()> {
        self.register(BackgroundTask::DeviceUnlockCheck, self.unlock_frequency, low_battery)
    }

    pub fn register_daily_cleanup(&self, low_battery: bool) -> Result<()> {
        self.register(BackgroundTask::DailyCleanup, self.cleanup_frequency, low_battery)
    }

    fn register(&self, task: BackgroundTask, frequency: Duration, low_battery: bool) -> Result<()> {
        let constraints = if low_battery {
            TaskConstraints::strict()
        } else {
            TaskConstraints::relaxed()
        };
        self.scheduler
            .register_periodic(task.task_name(), task, frequency, &constraints)
            .map_err(|e| CoreError::Background {
                task: task.task_name().to_string(),
                message: e.to_string(),
            })?;
        debug!(task = task.task_name(), ?constraints, "registered background task");
        Ok(())
    }
}

/// Serialized boundary between the OS task invocation and the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Correlation id for diagnostics across process boundaries.
    pub run_id: String,
    pub task: BackgroundTask,
    pub fired_at: DateTime<Utc>,
}

impl TaskDescriptor {
    pub fn new(task: BackgroundTask, fired_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            task,
            fired_at,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Outcome of one background invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BackgroundRunOutcome {
    NudgeShown { template_id: String },
    NothingDue { reason: String },
    Pruned { removed: usize },
}

/// One-shot background entry point.
///
/// Builds an engine against fresh state (never the foreground instance's
/// memory), initializes it, performs the descriptor's single operation, and
/// terminates.
pub async fn run_background_task(
    descriptor: &TaskDescriptor,
    deps: EngineDeps,
    config: EngineConfig,
) -> Result<BackgroundRunOutcome> {
    let content = deps.content.clone();
    let clock = deps.clock.clone();
    let engine = DeliveryEngine::new(deps, config)?;
    info!(run_id = %descriptor.run_id, task = descriptor.task.task_name(), "background task started");

    match descriptor.task {
        BackgroundTask::DeviceUnlockCheck => {
            engine.initialize().await?;
            if engine.status().await != SchedulerStatus::Ready {
                return Ok(BackgroundRunOutcome::NothingDue {
                    reason: format!("engine status {}", engine.status().await),
                });
            }
            let settings = content.user_settings().unwrap_or_default();
            let hour = clock.now_local().hour();
            let Some(window) = settings.window_for_hour(hour) else {
                return Ok(BackgroundRunOutcome::NothingDue {
                    reason: "no enabled window covers the current hour".to_string(),
                });
            };
            let Some(template) =
                content.random_for_window(window, settings.enabled_categories.as_deref())
            else {
                return Ok(BackgroundRunOutcome::NothingDue {
                    reason: "no active template".to_string(),
                });
            };
            if engine.show_device_unlock_nudge(&template).await {
                Ok(BackgroundRunOutcome::NudgeShown {
                    template_id: template.id,
                })
            } else {
                Ok(BackgroundRunOutcome::NothingDue {
                    reason: "delivery suppressed (cap, quiet hours, or conflict)".to_string(),
                })
            }
        }
        BackgroundTask::DailyCleanup => {
            // Cleanup only touches durable storage; permission state does
            // not gate it.
            let removed = engine.run_daily_cleanup().await?;
            Ok(BackgroundRunOutcome::Pruned { removed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_round_trips() {
        let descriptor = TaskDescriptor::new(BackgroundTask::DeviceUnlockCheck, Utc::now());
        let json = descriptor.to_json().unwrap();
        let parsed = TaskDescriptor::from_json(&json).unwrap();
        assert_eq!(parsed.task, BackgroundTask::DeviceUnlockCheck);
        assert_eq!(parsed.run_id, descriptor.run_id);
    }

    #[test]
    fn constraints_tighten_on_low_battery() {
        assert!(!TaskConstraints::relaxed().battery_not_low);
        let strict = TaskConstraints::strict();
        assert!(strict.battery_not_low);
        assert!(strict.requires_charging);
    }
}
