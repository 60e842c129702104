use clap::Subcommand;
use serde_json::json;

use carenudge_core::{AnalyticsKind, StateStore};

use crate::platform::build_engine;

#[derive(Subcommand)]
pub enum ServiceAction {
    /// Initialize the scheduler and print the resulting status
    Init,
    /// Print the persisted scheduler state as JSON
    Status,
    /// Prune delivery records beyond the retention window
    Cleanup,
}

pub async fn run(action: ServiceAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ServiceAction::Init => {
            let engine = build_engine()?;
            let ready = engine.initialize().await?;
            let out = json!({
                "status": engine.status().await.as_str(),
                "ready": ready,
                "is_initialized": engine.is_initialized().await,
                "needs_permission_explanation": engine.needs_permission_explanation().await,
                "needs_permission_settings_guidance":
                    engine.needs_permission_settings_guidance().await,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ServiceAction::Status => {
            let store = StateStore::open()?;
            let state = store.service_state()?;
            let counter = store.daily_counter()?;
            let out = json!({
                "service_state": state,
                "daily_counter": counter,
                "scheduled": store.scheduled_nudges()?,
                "reserved_ranges": store.reserved_ranges()?,
                "analytics": {
                    "delivered": store.analytics_count(AnalyticsKind::Delivered)?,
                    "viewed": store.analytics_count(AnalyticsKind::Viewed)?,
                    "replayed": store.analytics_count(AnalyticsKind::Replayed)?,
                    "saved": store.analytics_count(AnalyticsKind::Saved)?,
                    "dismissed": store.analytics_count(AnalyticsKind::Dismissed)?,
                },
                "show_permission_explanation": store.show_permission_explanation()?,
                "show_permission_settings": store.show_permission_settings()?,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        ServiceAction::Cleanup => {
            let engine = build_engine()?;
            let removed = engine.run_daily_cleanup().await?;
            println!("{}", json!({ "removed": removed }));
        }
    }
    Ok(())
}
