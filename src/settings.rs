//! The persisted selection and its boot-time validation.
//!
//! Store layout, fixed for compatibility with units in the field:
//!
//! ```text
//! offset 0   selection     1-8
//! offset 1   scan active   0/1
//! offset 2   video mode    0/1
//! ```
use log::{info, warn};
use std::fmt;

use crate::store::SelectionStore;

pub const SELECTION_ADDR: u16 = 0;
pub const SCAN_ACTIVE_ADDR: u16 = 1;
pub const VIDEO_MODE_ADDR: u16 = 2;

/// number of ROM banks behind the address lines
pub const BANK_COUNT: u8 = 8;

/// the active ROM bank, always 1-8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection(u8);

impl Selection {
    /// the known-good bank everything falls back to
    pub const DEFAULT: Selection = Selection(1);

    pub fn new(bank: u8) -> Option<Selection> {
        (1..=BANK_COUNT).contains(&bank).then_some(Selection(bank))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 3-bit value for the address select lines
    pub fn address(self) -> u8 {
        self.0 - 1
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bank {}", self.0)
    }
}

/// which of the two video timing standards the attached hardware is latched
/// to. persisted as a boolean: primary is 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    Primary,
    Alternate,
}

impl VideoMode {
    pub fn toggled(self) -> Self {
        match self {
            VideoMode::Primary => VideoMode::Alternate,
            VideoMode::Alternate => VideoMode::Primary,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(VideoMode::Primary),
            0 => Some(VideoMode::Alternate),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            VideoMode::Primary => 1,
            VideoMode::Alternate => 0,
        }
    }
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoMode::Primary => write!(f, "primary video"),
            VideoMode::Alternate => write!(f, "alternate video"),
        }
    }
}

fn bool_from_byte(byte: u8) -> Option<bool> {
    match byte {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// everything that survives a power cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub selection: Selection,
    /// false turns the liveness watchdog off (e.g. a cartridge that never
    /// scans the keyboard)
    pub scan_active: bool,
    pub video: VideoMode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            selection: Selection::DEFAULT,
            scan_active: true,
            video: VideoMode::Primary,
        }
    }
}

/// write a byte, logging instead of failing; the in-memory value stays
/// authoritative if the store is unhappy
fn store_byte(store: &mut dyn SelectionStore, addr: u16, value: u8) {
    if let Err(e) = store.update(addr, value) {
        warn!("could not persist 0x{:02x} at offset {}: {}", value, addr, e);
    }
}

impl Settings {
    /// load from the store, replacing anything out of range with its default
    /// and writing the default back
    pub fn load(store: &mut dyn SelectionStore) -> Settings {
        let defaults = Settings::default();

        let raw = store.read(SELECTION_ADDR);
        let selection = Selection::new(raw).unwrap_or_else(|| {
            info!("stored selection 0x{:02x} invalid, using {}", raw, defaults.selection);
            store_byte(&mut *store, SELECTION_ADDR, defaults.selection.get());
            defaults.selection
        });

        let raw = store.read(SCAN_ACTIVE_ADDR);
        let scan_active = bool_from_byte(raw).unwrap_or_else(|| {
            info!("stored scan flag 0x{:02x} invalid, scanning on", raw);
            store_byte(&mut *store, SCAN_ACTIVE_ADDR, defaults.scan_active as u8);
            defaults.scan_active
        });

        let raw = store.read(VIDEO_MODE_ADDR);
        let video = VideoMode::from_byte(raw).unwrap_or_else(|| {
            info!("stored video mode 0x{:02x} invalid, using {}", raw, defaults.video);
            store_byte(&mut *store, VIDEO_MODE_ADDR, defaults.video.to_byte());
            defaults.video
        });

        Settings {
            selection,
            scan_active,
            video,
        }
    }

    /// bank byte only; the watchdog fallback leaves the scan flag alone
    pub fn persist_bank(&self, store: &mut dyn SelectionStore) {
        store_byte(store, SELECTION_ADDR, self.selection.get());
    }

    /// bank and scan flag, as a chord sets them
    pub fn persist_selection(&self, store: &mut dyn SelectionStore) {
        self.persist_bank(store);
        store_byte(store, SCAN_ACTIVE_ADDR, self.scan_active as u8);
    }

    pub fn persist_video(&self, store: &mut dyn SelectionStore) {
        store_byte(store, VIDEO_MODE_ADDR, self.video.to_byte());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RamStore, ERASED};
    use proptest::prelude::*;

    fn stored(s: &RamStore) -> [u8; 3] {
        [
            s.read(SELECTION_ADDR),
            s.read(SCAN_ACTIVE_ADDR),
            s.read(VIDEO_MODE_ADDR),
        ]
    }

    #[test]
    fn test_selection_range() {
        assert_eq!(Selection::new(0), None);
        assert_eq!(Selection::new(9), None);
        for bank in 1..=8 {
            let s = Selection::new(bank).unwrap();
            assert_eq!(s.get(), bank);
            assert_eq!(s.address(), bank - 1);
        }
    }

    #[test]
    fn test_video_toggle() {
        assert_eq!(VideoMode::Primary.toggled(), VideoMode::Alternate);
        assert_eq!(VideoMode::Alternate.toggled(), VideoMode::Primary);
    }

    #[test]
    fn test_load_valid_untouched() {
        let mut s = RamStore::with_contents(16, &[5, 0, 0]);
        let settings = Settings::load(&mut s);
        assert_eq!(settings.selection.get(), 5);
        assert!(!settings.scan_active);
        assert_eq!(settings.video, VideoMode::Alternate);
        assert_eq!(s.writes(), 0);
    }

    #[test]
    fn test_load_blank_store() {
        let mut s = RamStore::new(16);
        assert_eq!(stored(&s), [ERASED; 3]);
        let settings = Settings::load(&mut s);
        assert_eq!(settings, Settings::default());
        assert_eq!(stored(&s), [1, 1, 1]);
    }

    #[test]
    fn test_persist() {
        let mut s = RamStore::new(16);
        let settings = Settings {
            selection: Selection::new(7).unwrap(),
            scan_active: false,
            video: VideoMode::Alternate,
        };
        settings.persist_selection(&mut s);
        settings.persist_video(&mut s);
        assert_eq!(stored(&s), [7, 0, 0]);
    }

    #[test]
    fn test_persist_failure_is_not_fatal() {
        // a store too small to hold the video byte
        let mut s = RamStore::new(2);
        let settings = Settings::load(&mut s);
        assert_eq!(settings.video, VideoMode::Primary);
        settings.persist_video(&mut s);
        assert_eq!(s.read(VIDEO_MODE_ADDR), ERASED);
    }

    proptest! {
        #[test]
        fn prop_bad_selection_resets_to_one(raw in any::<u8>().prop_filter("out of range", |b| !(1..=8).contains(b))) {
            let mut s = RamStore::with_contents(16, &[raw, 1, 1]);
            let settings = Settings::load(&mut s);
            prop_assert_eq!(settings.selection, Selection::DEFAULT);
            prop_assert_eq!(stored(&s), [1, 1, 1]);
        }

        #[test]
        fn prop_bad_flags_reset_to_true(scan in 2u8.., video in 2u8..) {
            let mut s = RamStore::with_contents(16, &[3, scan, video]);
            let settings = Settings::load(&mut s);
            prop_assert!(settings.scan_active);
            prop_assert_eq!(settings.video, VideoMode::Primary);
            prop_assert_eq!(stored(&s), [3, 1, 1]);
        }

        #[test]
        fn prop_valid_bytes_round_trip(bank in 1u8..=8, scan in 0u8..=1, video in 0u8..=1) {
            let mut s = RamStore::with_contents(16, &[bank, scan, video]);
            let settings = Settings::load(&mut s);
            prop_assert_eq!(settings.selection.get(), bank);
            prop_assert_eq!(settings.scan_active as u8, scan);
            prop_assert_eq!(settings.video.to_byte(), video);
            prop_assert_eq!(s.writes(), 0);
        }
    }
}
