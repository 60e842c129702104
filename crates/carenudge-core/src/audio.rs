//! Audio playback boundary.

use serde::{Deserialize, Serialize};

/// Playback path selected from the battery signal. `Reduced` skips waveform
/// pre-analysis and any pre-buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackFidelity {
    Full,
    Reduced,
}

/// Audio player collaborator. Playback failure is never fatal to a
/// delivery; the notification still shows without audio. An empty URL is a
/// caller bug and implementations may fail fast on it.
pub trait AudioPlayer: Send + Sync {
    fn play(
        &self,
        url: &str,
        fidelity: PlaybackFidelity,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
