//! # romswitch
//!
//! Controller for a ROM-switching board in a retro computer. Holding the
//! modifier key and pressing a digit picks one of eight ROM banks, turns the
//! keyboard watchdog off, or flips the video timing standard. The choice is
//! kept in EEPROM and every switch happens with the host held in reset.
//!
//! ## Design
//!
//! * the hardware is behind traits so the same controller runs on target and
//!   on the bench: `SignalLines` for pins, `SelectionStore` for EEPROM, `Delay`
//!   for busy waits
//! * row interrupts only snapshot the columns into a one-slot atomic mailbox;
//!   all decoding happens in the main loop
//! * the main loop is a fixed 1ms tick, which is also the clock for the
//!   watchdog and the modifier long press
//! * reset sequencing blocks; nothing else does
//! * no state change is ever refused with an error: bad EEPROM contents are
//!   replaced by defaults, stray keys are dropped, a silent bank is replaced
//!   by bank 1
//!
//! ## Model
//!
//! ```text
//! boot
//!  |-- park lines, load + repair settings, drive address lines
//!  `-- arm watchdog
//! row interrupt (x2)
//!  `-- KeyMailbox::on_row_falling  -- snapshot columns unless one is pending
//! main loop
//!  |-- event = mailbox.take()
//!  |     `-- modifier held? apply_key -> persist -> ResetSequencer
//!  |-- modifier held alone long enough? -> ResetSequencer (same bank)
//!  |-- any column low? satisfy watchdog : count down
//!  |     `-- expired -> bank 1 -> persist -> ResetSequencer
//!  `-- sleep(tick)
//! ```
pub mod bench;
pub mod config;
pub mod controller;
pub mod diag;
pub mod display;
pub mod error;
pub mod input;
pub mod keys;
pub mod lines;
pub mod sequencer;
pub mod settings;
pub mod store;
pub mod watchdog;
