use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::keys::{key_position, KeyMailbox, Row};
use crate::sequencer::Delay;
use crate::settings::VideoMode;

/// column sense lines decoded by the key decoder
pub const COLUMN_COUNT: usize = 5;
/// bank address select lines
pub const ADDRESS_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    fn from_bit(bit: u8) -> Self {
        if bit & 1 == 1 {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// everything the controller reads. all of these are active-low with pull-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLine {
    /// row strobes; interrupt on falling edge
    Row(Row),
    /// column sense, 0..COLUMN_COUNT
    Column(usize),
    /// the held "special" key that gates every chord
    Modifier,
    /// wired but never consulted by the controller
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLine {
    /// bank select bit, 0..ADDRESS_LINES
    Address(usize),
    /// video mode enable; the two are never high together
    Mode(VideoMode),
}

/// reset lines share a bus with the host, so they are only outputs while
/// asserted and float as inputs otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetLine {
    /// active-high here, inverted on the board
    Host,
    /// active-low
    Peripheral,
}

impl ResetLine {
    pub fn active_level(self) -> Level {
        match self {
            ResetLine::Host => Level::High,
            ResetLine::Peripheral => Level::Low,
        }
    }

    pub fn inactive_level(self) -> Level {
        match self {
            ResetLine::Host => Level::Low,
            ResetLine::Peripheral => Level::High,
        }
    }
}

/// the controller's view of its pins. implementations map the roles onto
/// real GPIO (or a simulation); pull-ups and edge interrupts are configured
/// by the implementation
pub trait SignalLines {
    fn level(&self, line: InputLine) -> Level;

    fn drive(&mut self, line: OutputLine, level: Level);

    fn set_direction(&mut self, line: ResetLine, direction: Direction);

    /// set the output latch of a reset line; only reaches the bus while the
    /// line is an output
    fn drive_reset(&mut self, line: ResetLine, level: Level);

    /// raw column snapshot: bit n is column n, set means high (released)
    fn columns(&self) -> u8 {
        (0..COLUMN_COUNT).fold(0, |acc, n| match self.level(InputLine::Column(n)) {
            Level::High => acc | 1 << n,
            Level::Low => acc,
        })
    }

    fn modifier_held(&self) -> bool {
        self.level(InputLine::Modifier) == Level::Low
    }

    fn drive_address(&mut self, address: u8) {
        for n in 0..ADDRESS_LINES {
            self.drive(OutputLine::Address(n), Level::from_bit(address >> n));
        }
    }
}

/// pin setup at boot: both mode lines low, both reset lines released
pub fn park(lines: &mut dyn SignalLines) {
    lines.drive(OutputLine::Mode(VideoMode::Primary), Level::Low);
    lines.drive(OutputLine::Mode(VideoMode::Alternate), Level::Low);
    for line in [ResetLine::Host, ResetLine::Peripheral] {
        lines.drive_reset(line, line.inactive_level());
        lines.set_direction(line, Direction::Input);
    }
}

/// what the controller did to the board, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    Drive(OutputLine, Level),
    Direction(ResetLine, Direction),
    ResetLevel(ResetLine, Level),
    Wait(u32),
}

/// levels of every line on the simulated board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub rows: [Level; 2],
    pub columns: [Level; COLUMN_COUNT],
    pub modifier: Level,
    pub status: Level,
    pub address: [Level; ADDRESS_LINES],
    /// indexed by `mode_index`
    pub mode: [Level; 2],
    /// indexed by `reset_index`
    pub reset_direction: [Direction; 2],
    pub reset_level: [Level; 2],
}

impl Default for BoardState {
    fn default() -> Self {
        BoardState {
            rows: [Level::High; 2],
            columns: [Level::High; COLUMN_COUNT],
            modifier: Level::High,
            status: Level::High,
            address: [Level::Low; ADDRESS_LINES],
            mode: [Level::Low; 2],
            reset_direction: [Direction::Input; 2],
            reset_level: [
                ResetLine::Host.inactive_level(),
                ResetLine::Peripheral.inactive_level(),
            ],
        }
    }
}

fn row_index(row: Row) -> usize {
    match row {
        Row::Odd => 0,
        Row::Even => 1,
    }
}

fn mode_index(mode: VideoMode) -> usize {
    match mode {
        VideoMode::Primary => 0,
        VideoMode::Alternate => 1,
    }
}

fn reset_index(line: ResetLine) -> usize {
    match line {
        ResetLine::Host => 0,
        ResetLine::Peripheral => 1,
    }
}

impl BoardState {
    /// the bank address currently on the select lines
    pub fn address(&self) -> u8 {
        self.address
            .iter()
            .enumerate()
            .fold(0, |acc, (n, level)| match level {
                Level::High => acc | 1 << n,
                Level::Low => acc,
            })
    }

    pub fn mode_level(&self, mode: VideoMode) -> Level {
        self.mode[mode_index(mode)]
    }

    /// asserted means driving the bus at the active level
    pub fn reset_asserted(&self, line: ResetLine) -> bool {
        let i = reset_index(line);
        self.reset_direction[i] == Direction::Output
            && self.reset_level[i] == line.active_level()
    }

    pub fn reset_direction(&self, line: ResetLine) -> Direction {
        self.reset_direction[reset_index(line)]
    }
}

#[derive(Debug, Default)]
struct Board {
    state: BoardState,
    journal: Vec<LineEvent>,
}

/// simulated board for the bench and for tests. clones share the same
/// board, so one handle can be lent to the controller while another
/// presses keys and inspects the outputs
#[derive(Debug, Clone, Default)]
pub struct BenchLines {
    board: Arc<Mutex<Board>>,
}

impl BenchLines {
    pub fn new() -> Self {
        Self::default()
    }

    fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BoardState {
        self.board().state.clone()
    }

    pub fn journal(&self) -> Vec<LineEvent> {
        self.board().journal.clone()
    }

    /// drain the journal
    pub fn take_journal(&self) -> Vec<LineEvent> {
        std::mem::take(&mut self.board().journal)
    }

    pub fn set_column(&self, column: usize, level: Level) {
        self.board().state.columns[column] = level;
    }

    pub fn set_row(&self, row: Row, level: Level) {
        self.board().state.rows[row_index(row)] = level;
    }

    pub fn set_modifier(&self, held: bool) {
        self.board().state.modifier = if held { Level::Low } else { Level::High };
    }

    pub fn set_status(&self, level: Level) {
        self.board().state.status = level;
    }

    /// press and release a digit key: pull its column low, strobe its row
    /// (which runs the row interrupt against the mailbox), then let go.
    /// returns whether the interrupt captured an event
    pub fn press_key(&self, digit: u8, mailbox: &KeyMailbox) -> bool {
        let Some((row, column)) = key_position(digit) else {
            return false;
        };
        self.set_column(column, Level::Low);
        self.set_row(row, Level::Low);
        let captured = mailbox.on_row_falling(row, self);
        self.set_row(row, Level::High);
        self.set_column(column, Level::High);
        captured
    }

    /// a delay that only records itself in the journal
    pub fn delay(&self) -> BenchDelay {
        BenchDelay {
            lines: self.clone(),
        }
    }
}

impl SignalLines for BenchLines {
    fn level(&self, line: InputLine) -> Level {
        let board = self.board();
        match line {
            InputLine::Row(row) => board.state.rows[row_index(row)],
            InputLine::Column(n) => board.state.columns[n],
            InputLine::Modifier => board.state.modifier,
            InputLine::Status => board.state.status,
        }
    }

    fn drive(&mut self, line: OutputLine, level: Level) {
        let mut board = self.board();
        match line {
            OutputLine::Address(n) => board.state.address[n] = level,
            OutputLine::Mode(mode) => board.state.mode[mode_index(mode)] = level,
        }
        board.journal.push(LineEvent::Drive(line, level));
    }

    fn set_direction(&mut self, line: ResetLine, direction: Direction) {
        let mut board = self.board();
        board.state.reset_direction[reset_index(line)] = direction;
        board.journal.push(LineEvent::Direction(line, direction));
    }

    fn drive_reset(&mut self, line: ResetLine, level: Level) {
        let mut board = self.board();
        board.state.reset_level[reset_index(line)] = level;
        board.journal.push(LineEvent::ResetLevel(line, level));
    }
}

/// journal-only delay for tests; returns immediately
pub struct BenchDelay {
    lines: BenchLines,
}

impl Delay for BenchDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.lines.board().journal.push(LineEvent::Wait(ms));
    }
}
