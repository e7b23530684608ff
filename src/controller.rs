//! # controller
//!
//! One context value owns everything that lives for the whole run: the
//! persisted settings, the liveness watchdog and the modifier countdown. The
//! main loop calls `tick` forever; each tick:
//!
//!  1. samples the modifier line
//!  2. takes at most one key event out of the mailbox; with the modifier
//!     held it is a chord, otherwise it is thrown away
//!       1-8  select that bank, scanning on
//!       0    select bank 1, scanning off (cartridges and the like)
//!       9    flip the video mode
//!  3. counts the modifier down while it is held alone; at zero the host is
//!     reset on the current bank
//!  4. samples the column lines for the watchdog; if the current bank has not
//!     scanned the keyboard for the whole timeout, bank 1 is reloaded
//!  5. busy-waits one tick
//!
//! Every change is persisted before the reset sequencer applies it, and
//! re-arms the watchdog afterwards.
use log::{debug, info, warn};

use crate::config::Timing;
use crate::keys::{KeyMailbox, COLUMN_MASK};
use crate::lines::{self, SignalLines};
use crate::sequencer::{Change, Delay, ResetSequencer};
use crate::settings::{Selection, Settings, VideoMode};
use crate::store::SelectionStore;
use crate::watchdog::{Liveness, Watchdog};

/// a recognised chord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// modifier + 1-8
    SelectBank(Selection),
    /// modifier + 0: bank 1 with the watchdog off
    SelectNonScanning,
    /// modifier + 9, carrying the mode switched to
    ToggleVideo(VideoMode),
}

/// what a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Applied(Gesture),
    /// a key arrived without the modifier held
    Discarded(u8),
    LongPressReset,
    /// watchdog timed out and bank 1 was reloaded
    Recovered,
}

pub struct Controller<'a> {
    lines: &'a mut dyn SignalLines,
    store: &'a mut dyn SelectionStore,
    delay: &'a mut dyn Delay,
    mailbox: &'a KeyMailbox,
    timing: Timing,
    sequencer: ResetSequencer,
    settings: Settings,
    watchdog: Watchdog,
    modifier_remaining: u32,
}

impl<'a> Controller<'a> {
    /// pin setup, load and validate the settings, put the bank on the
    /// address lines and start watching
    pub fn boot(
        lines: &'a mut dyn SignalLines,
        store: &'a mut dyn SelectionStore,
        delay: &'a mut dyn Delay,
        mailbox: &'a KeyMailbox,
        timing: Timing,
    ) -> Controller<'a> {
        lines::park(lines);
        let settings = Settings::load(store);
        lines.drive_address(settings.selection.address());
        info!(
            "boot: {}, keyboard scan {}, {}",
            settings.selection,
            if settings.scan_active { "watched" } else { "ignored" },
            settings.video
        );

        let mut watchdog = Watchdog::new(timing.scan_timeout_ticks);
        watchdog.arm(settings.scan_active);
        Controller {
            lines,
            store,
            delay,
            mailbox,
            timing,
            sequencer: ResetSequencer::new(timing),
            settings,
            watchdog,
            modifier_remaining: timing.modifier_hold_ticks,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn liveness(&self) -> Liveness {
        self.watchdog.state()
    }

    pub fn store(&self) -> &dyn SelectionStore {
        &*self.store
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// the main loop; never returns
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }

    /// one pass of the main loop, including the tick delay
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.poll();
        self.delay.delay_ms(self.timing.tick_ms);
        outcome
    }

    fn poll(&mut self) -> TickOutcome {
        let held = self.lines.modifier_held();
        let mut outcome = TickOutcome::Idle;

        if let Some(event) = self.mailbox.take() {
            let key = event.key();
            if held {
                if let Some(gesture) = self.apply_key(key) {
                    return TickOutcome::Applied(gesture);
                }
            } else {
                debug!("key {} without modifier, ignored", key);
            }
            outcome = TickOutcome::Discarded(key);
        }

        if self.count_modifier(held) {
            self.long_press_reset();
            return TickOutcome::LongPressReset;
        }

        let activity = self.lines.columns() & COLUMN_MASK != COLUMN_MASK;
        if self.watchdog.observe(activity) {
            self.recover();
            return TickOutcome::Recovered;
        }
        outcome
    }

    /// apply a chorded digit; the caller has already checked the modifier.
    /// anything outside 0-9 is ignored
    pub fn apply_key(&mut self, key: u8) -> Option<Gesture> {
        let gesture = match key {
            1..=8 => Gesture::SelectBank(Selection::new(key)?),
            0 => Gesture::SelectNonScanning,
            9 => Gesture::ToggleVideo(self.settings.video.toggled()),
            _ => {
                debug!("key {} is not a chord", key);
                return None;
            }
        };
        self.apply(gesture);
        Some(gesture)
    }

    fn apply(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::SelectBank(selection) => {
                self.settings.selection = selection;
                self.settings.scan_active = true;
                self.settings.persist_selection(self.store);
                info!("selected {}", selection);
                self.sequence(Change::Bank(selection));
            }
            Gesture::SelectNonScanning => {
                self.settings.selection = Selection::DEFAULT;
                self.settings.scan_active = false;
                self.settings.persist_selection(self.store);
                info!("selected {} without keyboard watch", Selection::DEFAULT);
                self.sequence(Change::Bank(Selection::DEFAULT));
            }
            Gesture::ToggleVideo(mode) => {
                self.settings.video = mode;
                self.settings.persist_video(self.store);
                info!("switched to {}", mode);
                self.sequence(Change::Mode(mode));
            }
        }
    }

    /// true when the modifier has been held alone for the full countdown
    fn count_modifier(&mut self, held: bool) -> bool {
        if !held {
            self.modifier_remaining = self.timing.modifier_hold_ticks;
            return false;
        }
        self.modifier_remaining = self.modifier_remaining.saturating_sub(1);
        self.modifier_remaining == 0
    }

    fn long_press_reset(&mut self) {
        info!("modifier held, resetting host on {}", self.settings.selection);
        self.sequence(Change::Bank(self.settings.selection));
    }

    fn recover(&mut self) {
        warn!(
            "no keyboard scan on {} for {} ticks, falling back to {}",
            self.settings.selection,
            self.timing.scan_timeout_ticks,
            Selection::DEFAULT
        );
        self.settings.selection = Selection::DEFAULT;
        self.settings.persist_bank(self.store);
        self.sequence(Change::Bank(Selection::DEFAULT));
    }

    /// reset-bracket the change, then restart both countdowns; the sequencer
    /// blocks for seconds, so anything counted before it is stale
    fn sequence(&mut self, change: Change) {
        self.sequencer.run(self.lines, self.delay, change);
        self.watchdog.arm(self.settings.scan_active);
        self.modifier_remaining = self.timing.modifier_hold_ticks;
    }
}
