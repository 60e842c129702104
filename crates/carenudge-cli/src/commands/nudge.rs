use chrono::Timelike;
use clap::Subcommand;
use serde_json::json;

use carenudge_core::{Clock, ContentStore, NudgeTemplate, SystemClock, TimeWindow, UserSettings};

use crate::content::TomlContentStore;
use crate::platform::build_engine;

#[derive(Subcommand)]
pub enum NudgeCmd {
    /// Schedule a nudge for a time window
    Schedule {
        /// Target window (morning | midday | evening)
        #[arg(long)]
        window: Option<TimeWindow>,
        /// Explicit template id; a daily pick is used otherwise
        #[arg(long)]
        template: Option<String>,
        /// Schedule every enabled window and register the cleanup task
        #[arg(long)]
        all: bool,
    },
    /// Show a nudge immediately, as the device-unlock trigger would
    Unlock {
        /// Explicit template id; a daily pick is used otherwise
        #[arg(long)]
        template: Option<String>,
    },
    /// Feed a notification response payload back into the engine
    Respond {
        /// Notification id the response belongs to
        #[arg(long)]
        id: u32,
        /// Wire payload, e.g. "tpl-breathing-01:view"
        #[arg(long)]
        payload: String,
    },
}

fn pick_template(
    content: &TomlContentStore,
    settings: &UserSettings,
    window: TimeWindow,
    explicit: Option<&str>,
) -> Result<NudgeTemplate, Box<dyn std::error::Error>> {
    let template = match explicit {
        Some(id) => content.template_by_id(id),
        None => content.random_for_window(window, settings.enabled_categories.as_deref()),
    };
    template.ok_or_else(|| "no matching template".into())
}

pub async fn run(cmd: NudgeCmd) -> Result<(), Box<dyn std::error::Error>> {
    let content = TomlContentStore::open()?;
    let settings = content.user_settings().unwrap_or_default();
    let engine = build_engine()?;

    match cmd {
        NudgeCmd::Schedule {
            window,
            template,
            all,
        } => {
            if !engine.initialize().await? {
                return Err(format!("scheduler not ready: {}", engine.status().await).into());
            }
            if all {
                let scheduled = engine.schedule_time_based_nudges().await?;
                println!("{}", json!({ "scheduled_windows": scheduled }));
                return Ok(());
            }
            let window = window.ok_or("--window or --all is required")?;
            let template = pick_template(&content, &settings, window, template.as_deref())?;
            let scheduled = engine
                .schedule_nudge_for_time_window(&template, window)
                .await;
            println!(
                "{}",
                json!({ "scheduled": scheduled, "template": template.id, "window": window.as_str() })
            );
        }
        NudgeCmd::Unlock { template } => {
            if !engine.initialize().await? {
                return Err(format!("scheduler not ready: {}", engine.status().await).into());
            }
            let hour = SystemClock.now_local().hour();
            let window = settings.window_for_hour(hour).unwrap_or(TimeWindow::Morning);
            let template = pick_template(&content, &settings, window, template.as_deref())?;
            let delivered = engine.show_device_unlock_nudge(&template).await;
            println!(
                "{}",
                json!({ "delivered": delivered, "template": template.id })
            );
        }
        NudgeCmd::Respond { id, payload } => {
            let applied = engine.handle_response(id, &payload).await;
            println!("{}", json!({ "applied": applied }));
        }
    }
    Ok(())
}
