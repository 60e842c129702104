pub mod state;
pub mod store;

pub use state::ServiceState;
pub use store::{AnalyticsKind, StateStore};

use std::path::PathBuf;

/// Returns `~/.config/carenudge[-dev]/` based on CARENUDGE_ENV.
///
/// Set CARENUDGE_ENV=dev to use the development data directory, or
/// CARENUDGE_DATA_DIR to force an explicit directory (tests, sandboxes).
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(explicit) = std::env::var("CARENUDGE_DATA_DIR") {
        let dir = PathBuf::from(explicit);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CARENUDGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("carenudge-dev")
    } else {
        base_dir.join("carenudge")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
