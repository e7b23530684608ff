//! Runs the real controller against a simulated board.
//!
//! The operator's actions become line changes: digits strobe the matching
//! row with the column held low (which runs the row interrupt), the modifier
//! latches, and "host scanning" pulls a column low every few ticks the way a
//! running ROM image would. Everything else is the unmodified controller.
use log::debug;
use std::io;

use crate::controller::Controller;
use crate::diag::RingLog;
use crate::display::{BenchStatus, StatusView};
use crate::input::{BenchAction, BenchInput};
use crate::keys::KeyMailbox;
use crate::lines::{BenchLines, Level};

/// ticks between status redraws
pub const REDRAW_EVERY: u64 = 50;
/// ticks between simulated keyboard scans
pub const SCAN_PERIOD: u64 = 20;

pub struct Bench<'a> {
    lines: BenchLines,
    mailbox: &'a KeyMailbox,
    input: &'a mut dyn BenchInput,
    view: &'a mut dyn StatusView,
    log: Option<&'a RingLog>,
    modifier_held: bool,
    host_scanning: bool,
    ticks: u64,
}

impl<'a> Bench<'a> {
    /// `lines` must share its board with the controller's lines
    pub fn new(
        lines: BenchLines,
        mailbox: &'a KeyMailbox,
        input: &'a mut dyn BenchInput,
        view: &'a mut dyn StatusView,
    ) -> Self {
        Bench {
            lines,
            mailbox,
            input,
            view,
            log: None,
            modifier_held: false,
            host_scanning: true,
            ticks: 0,
        }
    }

    /// show these diagnostics on the status panel
    pub fn with_log(mut self, log: &'a RingLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn host_scanning(&self) -> bool {
        self.host_scanning
    }

    /// run until the operator quits or `max_ticks` have passed. returns the
    /// number of ticks run
    pub fn run(&mut self, controller: &mut Controller, max_ticks: Option<u64>) -> Result<u64, io::Error> {
        while max_ticks.map_or(true, |max| self.ticks < max) {
            for action in self.input.poll_actions()? {
                if !self.act(action) {
                    self.redraw(controller)?;
                    return Ok(self.ticks);
                }
            }

            let scan = self.host_scanning && self.ticks % SCAN_PERIOD == 0;
            if scan {
                self.lines.set_column(0, Level::Low);
            }
            controller.tick();
            if scan {
                self.lines.set_column(0, Level::High);
            }

            if self.ticks % REDRAW_EVERY == 0 {
                self.redraw(controller)?;
            }
            self.ticks += 1;
        }
        Ok(self.ticks)
    }

    /// false means quit
    fn act(&mut self, action: BenchAction) -> bool {
        match action {
            BenchAction::Key(digit) => {
                if !self.lines.press_key(digit, self.mailbox) {
                    debug!("key {} dropped, event still pending", digit);
                }
            }
            BenchAction::ToggleModifier => {
                self.modifier_held = !self.modifier_held;
                self.lines.set_modifier(self.modifier_held);
            }
            BenchAction::ToggleScanning => self.host_scanning = !self.host_scanning,
            BenchAction::Quit => return false,
        }
        true
    }

    fn redraw(&mut self, controller: &Controller) -> Result<(), io::Error> {
        let status = BenchStatus {
            board: self.lines.snapshot(),
            settings: controller.settings(),
            liveness: controller.liveness(),
            host_scanning: self.host_scanning,
            ticks: self.ticks,
            log: self.log.map(RingLog::lines).unwrap_or_default(),
        };
        self.view.draw(&status)
    }
}
