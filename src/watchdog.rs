//! Detects a bank that never scans the keyboard.
//!
//! A healthy ROM image strobes the keyboard constantly, so some column line
//! reads low sooner or later. If nothing is seen for the whole timeout the
//! selected image is assumed bad and the controller falls back to bank 1.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// counting down; `remaining` ticks left before recovery
    Watching { remaining: u32 },
    /// activity seen, or scanning not expected for this bank
    Satisfied,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: u32,
    state: Liveness,
}

impl Watchdog {
    /// starts satisfied; `arm` once the selection is known
    pub fn new(timeout_ticks: u32) -> Self {
        Watchdog {
            timeout: timeout_ticks,
            state: Liveness::Satisfied,
        }
    }

    /// after any selection change
    pub fn arm(&mut self, scan_active: bool) {
        self.state = if scan_active {
            Liveness::Watching {
                remaining: self.timeout,
            }
        } else {
            Liveness::Satisfied
        };
    }

    /// feed one tick's passive sample. returns true when the timeout ran out;
    /// the caller recovers and re-arms
    pub fn observe(&mut self, activity: bool) -> bool {
        match self.state {
            Liveness::Satisfied => false,
            Liveness::Watching { .. } if activity => {
                self.state = Liveness::Satisfied;
                false
            }
            Liveness::Watching { remaining } => {
                let remaining = remaining.saturating_sub(1);
                self.state = Liveness::Watching { remaining };
                remaining == 0
            }
        }
    }

    pub fn state(&self) -> Liveness {
        self.state
    }
}
