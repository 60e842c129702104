use chrono::Utc;
use clap::Subcommand;

use carenudge_core::{run_background_task, BackgroundTask, EngineConfig, TaskDescriptor};

use crate::platform;

#[derive(Subcommand)]
pub enum BackgroundAction {
    /// Simulate one out-of-process background invocation
    Run {
        /// Task name (deviceUnlockCheck | dailyCleanup)
        task: String,
    },
}

pub async fn run(action: BackgroundAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        BackgroundAction::Run { task } => {
            let task = match task.as_str() {
                "deviceUnlockCheck" => BackgroundTask::DeviceUnlockCheck,
                "dailyCleanup" => BackgroundTask::DailyCleanup,
                other => return Err(format!("unknown background task: {other}").into()),
            };

            // Round-trip the descriptor through its wire form, the way an
            // OS task payload would arrive.
            let wire = TaskDescriptor::new(task, Utc::now()).to_json()?;
            let descriptor = TaskDescriptor::from_json(&wire)?;
            let outcome =
                run_background_task(&descriptor, platform::deps()?, EngineConfig::default())
                    .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }
    Ok(())
}
