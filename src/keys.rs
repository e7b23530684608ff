//! Chord key decoding.
//!
//! Only the ten digit keys are wired in: two row strobes and five column
//! sense lines. A falling edge on either row runs [`KeyMailbox::on_row_falling`]
//! in interrupt context, which does nothing but snapshot the columns into a
//! single-slot mailbox. The main loop later takes the event out and turns it
//! into a digit.
//!
//! ```text
//! column bit |  0   1   2   3   4
//! -----------+--------------------
//! odd row    |  1   3   5   7   9
//! even row   |  2   4   6   8   0
//! ```
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::lines::SignalLines;

/// all five column bits
pub const COLUMN_MASK: u8 = 0x1f;

/// column bit -> digit on the odd row. this is the keyboard wiring, and the
/// order is also the priority when more than one column reads low
const COLUMN_DIGITS: [u8; 5] = [1, 3, 5, 7, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    /// row A: 1 3 5 7 9
    Odd,
    /// row B: 2 4 6 8 0
    Even,
}

/// a captured row interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// raw snapshot, active-low, always has at least one bit low
    columns: u8,
    row: Row,
}

impl KeyEvent {
    /// applies the noise filter: nothing pressed (all high) and everything
    /// pressed (all low) are both rejected
    pub fn from_snapshot(row: Row, raw_columns: u8) -> Option<KeyEvent> {
        let columns = raw_columns & COLUMN_MASK;
        if columns == COLUMN_MASK || columns == 0 {
            return None;
        }
        Some(KeyEvent { columns, row })
    }

    pub fn row(&self) -> Row {
        self.row
    }

    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// the digit 0-9. a snapshot with several columns low (two keys at once,
    /// or a torn read) still decodes: the first column in table order wins
    pub fn key(&self) -> u8 {
        let asserted = !self.columns & COLUMN_MASK;
        let odd = COLUMN_DIGITS
            .iter()
            .enumerate()
            .find(|(bit, _)| asserted & (1u8 << *bit) != 0)
            .map_or(COLUMN_DIGITS[0], |(_, digit)| *digit);
        match self.row {
            Row::Odd => odd,
            Row::Even => (odd + 1) % 10,
        }
    }
}

/// where a digit lives on the two rows: (row, column bit)
pub fn key_position(digit: u8) -> Option<(Row, usize)> {
    if digit > 9 {
        return None;
    }
    let (row, odd) = if digit % 2 == 1 {
        (Row::Odd, digit)
    } else {
        (Row::Even, (digit + 9) % 10)
    };
    COLUMN_DIGITS
        .iter()
        .position(|d| *d == odd)
        .map(|column| (row, column))
}

/// slot states
const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// single-slot mailbox between the row interrupts and the main loop.
///
/// an interrupt claims the empty slot with a compare-exchange, writes the
/// payload and then marks it ready; the main loop only reads a ready slot and
/// empties it afterwards. the claim means the two row handlers may preempt
/// each other: exactly one of them gets the slot and the other is dropped, so
/// the row and the columns always come from the same interrupt. while an
/// event is pending further interrupts are dropped
#[derive(Debug)]
pub struct KeyMailbox {
    state: AtomicU8,
    columns: AtomicU8,
    even_row: AtomicBool,
}

impl KeyMailbox {
    pub const fn new() -> Self {
        KeyMailbox {
            state: AtomicU8::new(EMPTY),
            columns: AtomicU8::new(COLUMN_MASK),
            even_row: AtomicBool::new(false),
        }
    }

    /// interrupt side. returns false when the event was dropped, either
    /// because the slot is taken or because the snapshot is noise
    pub fn capture(&self, row: Row, raw_columns: u8) -> bool {
        let Some(event) = KeyEvent::from_snapshot(row, raw_columns) else {
            return false;
        };
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        self.columns.store(event.columns, Ordering::Relaxed);
        self.even_row.store(event.row == Row::Even, Ordering::Relaxed);
        self.state.store(READY, Ordering::Release);
        true
    }

    /// body of the row interrupt handler
    pub fn on_row_falling(&self, row: Row, lines: &dyn SignalLines) -> bool {
        if self.is_pending() {
            return false;
        }
        self.capture(row, lines.columns())
    }

    /// true from the moment an interrupt claims the slot until the main loop
    /// takes the event
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) != EMPTY
    }

    /// main loop side. a slot still being written is left alone
    pub fn take(&self) -> Option<KeyEvent> {
        if self.state.load(Ordering::Acquire) != READY {
            return None;
        }
        let columns = self.columns.load(Ordering::Relaxed);
        let row = if self.even_row.load(Ordering::Relaxed) {
            Row::Even
        } else {
            Row::Odd
        };
        self.state.store(EMPTY, Ordering::Release);
        KeyEvent::from_snapshot(row, columns)
    }
}

impl Default for KeyMailbox {
    fn default() -> Self {
        Self::new()
    }
}
