//! User settings consumed from the content collaborator.
//!
//! Every field carries a serde default so a partial settings document from
//! an older app version deserializes cleanly.

use serde::{Deserialize, Serialize};

use crate::nudge::NudgeCategory;
use crate::window::{TimeWindow, TimeWindowCustomization, WindowHours};

/// Notification sub-preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPrefs {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Named notification sound, if the user picked one.
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default = "default_true")]
    pub vibration: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sound: None,
            vibration: default_true(),
        }
    }
}

/// Hours during which immediate nudges are suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHoursPolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_quiet_start")]
    pub start_hour: u32,
    #[serde(default = "default_quiet_end")]
    pub end_hour: u32,
}

impl QuietHoursPolicy {
    /// Whether `hour` falls inside quiet hours. The range may wrap
    /// midnight (the 22 -> 7 default does).
    pub fn contains(&self, hour: u32) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start_hour <= self.end_hour {
            self.start_hour <= hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for QuietHoursPolicy {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            start_hour: default_quiet_start(),
            end_hour: default_quiet_end(),
        }
    }
}

/// User settings read at schedule time, never persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default = "default_windows")]
    pub enabled_windows: Vec<TimeWindow>,
    #[serde(default)]
    pub window_overrides: Vec<TimeWindowCustomization>,
    /// `None` means every category is eligible.
    #[serde(default)]
    pub enabled_categories: Option<Vec<NudgeCategory>>,
    #[serde(default = "default_daily_max")]
    pub daily_max: u32,
    #[serde(default)]
    pub notifications: NotificationPrefs,
    #[serde(default)]
    pub quiet_hours: QuietHoursPolicy,
}

impl UserSettings {
    pub fn window_enabled(&self, window: TimeWindow) -> bool {
        self.enabled_windows.contains(&window)
    }

    /// Effective hours for a window: user override, or the built-in hours.
    pub fn hours_for(&self, window: TimeWindow) -> WindowHours {
        self.window_overrides
            .iter()
            .find(|o| o.window == window)
            .map(|o| o.hours())
            .unwrap_or_else(|| window.default_hours())
    }

    /// The enabled window whose hours contain `hour`, if any.
    pub fn window_for_hour(&self, hour: u32) -> Option<TimeWindow> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| self.window_enabled(*w) && self.hours_for(*w).contains(hour))
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            enabled_windows: default_windows(),
            window_overrides: Vec::new(),
            enabled_categories: None,
            daily_max: default_daily_max(),
            notifications: NotificationPrefs::default(),
            quiet_hours: QuietHoursPolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_daily_max() -> u32 {
    3
}
fn default_quiet_start() -> u32 {
    22
}
fn default_quiet_end() -> u32 {
    7
}
fn default_windows() -> Vec<TimeWindow> {
    TimeWindow::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_document_fills_defaults() {
        let settings: UserSettings = serde_json::from_str(r#"{"daily_max": 2}"#).unwrap();
        assert_eq!(settings.daily_max, 2);
        assert_eq!(settings.enabled_windows.len(), 3);
        assert!(settings.notifications.enabled);
        assert!(settings.quiet_hours.enabled);
    }

    #[test]
    fn quiet_hours_wrap_midnight() {
        let policy = QuietHoursPolicy::default();
        assert!(policy.contains(23));
        assert!(policy.contains(3));
        assert!(!policy.contains(12));
        assert!(!policy.contains(7));
    }

    #[test]
    fn disabled_quiet_hours_contain_nothing() {
        let policy = QuietHoursPolicy {
            enabled: false,
            ..QuietHoursPolicy::default()
        };
        assert!(!policy.contains(23));
    }

    #[test]
    fn window_override_wins() {
        let settings = UserSettings {
            window_overrides: vec![TimeWindowCustomization {
                window: TimeWindow::Morning,
                start_hour: 8,
                end_hour: 10,
            }],
            ..UserSettings::default()
        };
        assert_eq!(settings.hours_for(TimeWindow::Morning).start_hour, 8);
        assert_eq!(settings.hours_for(TimeWindow::Midday).start_hour, 11);
        assert_eq!(settings.window_for_hour(9), Some(TimeWindow::Morning));
        assert_eq!(settings.window_for_hour(22), None);
    }
}
