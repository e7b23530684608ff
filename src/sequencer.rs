//! Reset bracketing for every hardware selection change.
//!
//! The host must never see a select line move while it is running, so each
//! change is wrapped like this:
//!
//! ```text
//!  host reset    ___/^^^^^^^^^^^^^^^^^^^^^^^^^^^^\________________________
//!  periph reset  ^^^^\___________________________________/^^^^^^^^^^^^^^^^
//!  apply             |X| (address lines, or a 500ms mode pulse)
//!                    |<-- settle 2000 -->|<200>|<300>|<-- resume 2000 -->|
//! ```
//!
//! The waits are true blocking delays. Nothing cancels a sequence once it
//! starts; row interrupts still fire during the waits and their events are
//! picked up by the next loop iteration.
use log::debug;
use std::time::Duration;

use crate::config::Timing;
use crate::lines::{Direction, Level, OutputLine, ResetLine, SignalLines};
use crate::settings::{Selection, VideoMode};

/// blocking delays
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// busy-waits with spin_sleep, accurate to well under a millisecond
#[derive(Default)]
pub struct SpinDelay;

impl SpinDelay {
    pub fn new() -> Self {
        SpinDelay
    }
}

impl Delay for SpinDelay {
    fn delay_ms(&mut self, ms: u32) {
        spin_sleep::sleep(Duration::from_millis(ms as u64));
    }
}

/// what gets applied while the host is held in reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Bank(Selection),
    Mode(VideoMode),
}

pub struct ResetSequencer {
    timing: Timing,
}

impl ResetSequencer {
    pub fn new(timing: Timing) -> Self {
        ResetSequencer { timing }
    }

    /// runs to completion; takes roughly settle + release + resume
    pub fn run(&self, lines: &mut dyn SignalLines, delay: &mut dyn Delay, change: Change) {
        debug!("reset sequence: {:?}", change);
        assert_reset(lines, ResetLine::Host);
        assert_reset(lines, ResetLine::Peripheral);

        match change {
            Change::Bank(selection) => lines.drive_address(selection.address()),
            Change::Mode(mode) => self.pulse_mode(lines, delay, mode),
        }
        delay.delay_ms(self.timing.settle_ms);

        release_reset(lines, delay, ResetLine::Host, self.timing.host_release_ms);
        release_reset(
            lines,
            delay,
            ResetLine::Peripheral,
            self.timing.peripheral_release_ms,
        );
        delay.delay_ms(self.timing.resume_ms);
    }

    /// the other line goes low first so the two are never high together
    fn pulse_mode(&self, lines: &mut dyn SignalLines, delay: &mut dyn Delay, mode: VideoMode) {
        lines.drive(OutputLine::Mode(mode.toggled()), Level::Low);
        lines.drive(OutputLine::Mode(mode), Level::High);
        delay.delay_ms(self.timing.mode_pulse_ms);
        lines.drive(OutputLine::Mode(mode), Level::Low);
    }
}

fn assert_reset(lines: &mut dyn SignalLines, line: ResetLine) {
    lines.set_direction(line, Direction::Output);
    lines.drive_reset(line, line.active_level());
}

fn release_reset(lines: &mut dyn SignalLines, delay: &mut dyn Delay, line: ResetLine, buffer_ms: u32) {
    lines.drive_reset(line, line.inactive_level());
    delay.delay_ms(buffer_ms);
    lines.set_direction(line, Direction::Input);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{BenchLines, LineEvent};
    use std::time::Instant;

    fn run(change: Change) -> (BenchLines, Vec<LineEvent>) {
        let lines = BenchLines::new();
        let mut delay = lines.delay();
        let mut driver = lines.clone();
        ResetSequencer::new(Timing::default()).run(&mut driver, &mut delay, change);
        let journal = lines.take_journal();
        (lines, journal)
    }

    fn assert_prologue_and_epilogue(journal: &[LineEvent]) {
        use LineEvent::*;
        assert_eq!(
            journal[..4],
            [
                Direction(ResetLine::Host, crate::lines::Direction::Output),
                ResetLevel(ResetLine::Host, Level::High),
                Direction(ResetLine::Peripheral, crate::lines::Direction::Output),
                ResetLevel(ResetLine::Peripheral, Level::Low),
            ]
        );
        assert_eq!(
            journal[journal.len() - 8..],
            [
                Wait(2_000),
                ResetLevel(ResetLine::Host, Level::Low),
                Wait(200),
                Direction(ResetLine::Host, crate::lines::Direction::Input),
                ResetLevel(ResetLine::Peripheral, Level::High),
                Wait(300),
                Direction(ResetLine::Peripheral, crate::lines::Direction::Input),
                Wait(2_000),
            ]
        );
    }

    #[test]
    fn test_bank_sequence() {
        let (lines, journal) = run(Change::Bank(Selection::new(5).unwrap()));
        assert_prologue_and_epilogue(&journal);
        // address 4 = 0b100
        assert_eq!(
            journal[4..7],
            [
                LineEvent::Drive(OutputLine::Address(0), Level::Low),
                LineEvent::Drive(OutputLine::Address(1), Level::Low),
                LineEvent::Drive(OutputLine::Address(2), Level::High),
            ]
        );
        assert_eq!(journal.len(), 4 + 3 + 8);
        let s = lines.snapshot();
        assert_eq!(s.address(), 4);
        assert!(!s.reset_asserted(ResetLine::Host));
        assert!(!s.reset_asserted(ResetLine::Peripheral));
    }

    #[test]
    fn test_mode_sequence() {
        let (lines, journal) = run(Change::Mode(VideoMode::Alternate));
        assert_prologue_and_epilogue(&journal);
        assert_eq!(
            journal[4..8],
            [
                LineEvent::Drive(OutputLine::Mode(VideoMode::Primary), Level::Low),
                LineEvent::Drive(OutputLine::Mode(VideoMode::Alternate), Level::High),
                LineEvent::Wait(500),
                LineEvent::Drive(OutputLine::Mode(VideoMode::Alternate), Level::Low),
            ]
        );
        let s = lines.snapshot();
        assert_eq!(s.mode, [Level::Low, Level::Low]);
        // address lines untouched
        assert!(!journal
            .iter()
            .any(|e| matches!(e, LineEvent::Drive(OutputLine::Address(_), _))));
    }

    #[test]
    fn test_mode_lines_never_both_high() {
        for mode in [VideoMode::Primary, VideoMode::Alternate] {
            let (_, journal) = run(Change::Mode(mode));
            let mut high = [false; 2];
            for e in journal {
                if let LineEvent::Drive(OutputLine::Mode(m), level) = e {
                    high[(m == VideoMode::Alternate) as usize] = level == Level::High;
                    assert!(!(high[0] && high[1]));
                }
            }
        }
    }

    #[test]
    fn test_reset_lines_output_only_while_asserted() {
        let (_, journal) = run(Change::Bank(Selection::DEFAULT));
        // direction changes bracket the asserted window for each line
        for line in [ResetLine::Host, ResetLine::Peripheral] {
            let directions: Vec<_> = journal
                .iter()
                .filter_map(|e| match e {
                    LineEvent::Direction(l, d) if *l == line => Some(*d),
                    _ => None,
                })
                .collect();
            assert_eq!(directions, vec![Direction::Output, Direction::Input]);
        }
    }

    #[test]
    fn test_total_wait() {
        let (_, journal) = run(Change::Mode(VideoMode::Primary));
        let total: u32 = journal
            .iter()
            .filter_map(|e| match e {
                LineEvent::Wait(ms) => Some(*ms),
                _ => None,
            })
            .sum();
        assert_eq!(total, 500 + 2_000 + 200 + 300 + 2_000);
    }

    #[test]
    fn test_spin_delay_blocks() {
        let mut d = SpinDelay::new();
        let start = Instant::now();
        d.delay_ms(5);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
