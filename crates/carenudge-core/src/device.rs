//! Device condition monitoring: battery and platform version.
//!
//! The monitor reads the platform version once at construction and refreshes
//! the battery snapshot on demand. It feeds two adaptive signals: the
//! low-battery reduced-fidelity path, and the fallback notification style on
//! platforms below the channel floor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Charging state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryState {
    Charging,
    Discharging,
    Full,
    Unknown,
}

/// Battery/device-info collaborator boundary.
pub trait DeviceProbe: Send + Sync {
    /// Battery level, 0-100.
    fn battery_level(&self) -> u8;

    fn battery_state(&self) -> BatteryState;

    /// Platform major version / API level.
    fn platform_version(&self) -> u32;
}

/// Point-in-time battery reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatterySnapshot {
    pub level: u8,
    pub state: BatteryState,
}

/// Adaptive policy signal consumed by the delivery engine and the
/// background trigger registrar.
pub struct DeviceConditionMonitor {
    probe: Arc<dyn DeviceProbe>,
    platform_version: u32,
    low_battery_threshold: u8,
    channel_floor: u32,
    snapshot: BatterySnapshot,
}

impl DeviceConditionMonitor {
    pub fn new(probe: Arc<dyn DeviceProbe>, low_battery_threshold: u8, channel_floor: u32) -> Self {
        let platform_version = probe.platform_version();
        let snapshot = BatterySnapshot {
            level: probe.battery_level(),
            state: probe.battery_state(),
        };
        Self {
            probe,
            platform_version,
            low_battery_threshold,
            channel_floor,
            snapshot,
        }
    }

    /// Re-read the battery and return the fresh snapshot.
    pub fn refresh(&mut self) -> BatterySnapshot {
        self.snapshot = BatterySnapshot {
            level: self.probe.battery_level(),
            state: self.probe.battery_state(),
        };
        self.snapshot
    }

    pub fn snapshot(&self) -> BatterySnapshot {
        self.snapshot
    }

    /// Low level while not on power.
    pub fn is_low_battery(&self) -> bool {
        self.snapshot.level <= self.low_battery_threshold
            && !matches!(self.snapshot.state, BatteryState::Charging | BatteryState::Full)
    }

    /// False below the platform-version floor; triggers the fallback
    /// notification style without channel-specific features.
    pub fn supports_modern_channels(&self) -> bool {
        self.platform_version >= self.channel_floor
    }

    pub fn platform_version(&self) -> u32 {
        self.platform_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    struct FakeProbe {
        level: AtomicU8,
        charging: bool,
        version: u32,
    }

    impl DeviceProbe for FakeProbe {
        fn battery_level(&self) -> u8 {
            self.level.load(Ordering::Relaxed)
        }

        fn battery_state(&self) -> BatteryState {
            if self.charging {
                BatteryState::Charging
            } else {
                BatteryState::Discharging
            }
        }

        fn platform_version(&self) -> u32 {
            self.version
        }
    }

    #[test]
    fn low_battery_needs_discharge() {
        let probe = Arc::new(FakeProbe {
            level: AtomicU8::new(15),
            charging: false,
            version: 33,
        });
        let monitor = DeviceConditionMonitor::new(probe, 20, 26);
        assert!(monitor.is_low_battery());
        assert!(monitor.supports_modern_channels());

        let charging = Arc::new(FakeProbe {
            level: AtomicU8::new(15),
            charging: true,
            version: 33,
        });
        let monitor = DeviceConditionMonitor::new(charging, 20, 26);
        assert!(!monitor.is_low_battery());
    }

    #[test]
    fn refresh_picks_up_new_level() {
        let probe = Arc::new(FakeProbe {
            level: AtomicU8::new(80),
            charging: false,
            version: 24,
        });
        let mut monitor = DeviceConditionMonitor::new(probe.clone(), 20, 26);
        assert!(!monitor.is_low_battery());
        assert!(!monitor.supports_modern_channels());

        probe.level.store(10, Ordering::Relaxed);
        monitor.refresh();
        assert!(monitor.is_low_battery());
    }
}
