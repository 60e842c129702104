use clap::Subcommand;
use serde_json::json;

use carenudge_core::StateStore;

use crate::platform::build_engine;

#[derive(Subcommand)]
pub enum IdsAction {
    /// Reserve a notification id band for another producer
    Reserve {
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
        /// Name of the producer claiming the band
        #[arg(long)]
        owner: String,
    },
    /// List reserved id ranges
    List,
}

pub async fn run(action: IdsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        IdsAction::Reserve { start, end, owner } => {
            let engine = build_engine()?;
            let added = engine.register_reserved_id_range(start, end, &owner).await?;
            println!(
                "{}",
                json!({ "added": added, "start": start, "end": end, "owner": owner })
            );
        }
        IdsAction::List => {
            let store = StateStore::open()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&store.reserved_ranges()?)?
            );
        }
    }
    Ok(())
}
