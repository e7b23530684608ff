use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// every delay and countdown the controller uses. the defaults are what
/// deployed units run with; the reset timings in particular are hardware
/// requirements and should only be changed for bench work
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Timing {
    /// main loop busy-delay; the time base for both countdowns
    pub tick_ms: u32,
    /// ticks without column activity before the watchdog reloads bank 1
    pub scan_timeout_ticks: u32,
    /// ticks the modifier must be held alone before the host is reset
    pub modifier_hold_ticks: u32,
    /// how long a mode-enable line is held high
    pub mode_pulse_ms: u32,
    /// wait with reset asserted after the new selection is applied
    pub settle_ms: u32,
    /// host-reset line release buffer before it goes back to input
    pub host_release_ms: u32,
    /// peripheral-reset line release buffer before it goes back to input
    pub peripheral_release_ms: u32,
    /// wait after both resets are released, before polling resumes
    pub resume_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            tick_ms: 1,
            scan_timeout_ticks: 10_000,
            modifier_hold_ticks: 2_000,
            mode_pulse_ms: 500,
            settle_ms: 2_000,
            host_release_ms: 200,
            peripheral_release_ms: 300,
            resume_ms: 2_000,
        }
    }
}

impl Timing {
    /// missing fields fall back to the defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let timing: Timing = serde_json::from_str(json)?;
        timing.validate()?;
        Ok(timing)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// a countdown of zero expires on every tick, which would re-run the
    /// reset sequence forever
    pub fn validate(&self) -> Result<()> {
        let countdowns = [
            ("scan_timeout_ticks", self.scan_timeout_ticks),
            ("modifier_hold_ticks", self.modifier_hold_ticks),
        ];
        match countdowns.iter().find(|(_, ticks)| *ticks == 0) {
            Some((field, _)) => Err(Error::InvalidTiming { field: *field }),
            None => Ok(()),
        }
    }
}
