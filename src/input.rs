use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;

/// something the person at the bench asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchAction {
    /// press and release a digit key
    Key(u8),
    /// a terminal can't report a held key, so the modifier latches
    ToggleModifier,
    /// simulate the host scanning its keyboard (or stopping)
    ToggleScanning,
    Quit,
}

/// map of terminal characters to bench actions; digits press the matching
/// key on the simulated keyboard
const BENCH_KEYMAP: [(char, BenchAction); 13] = [
    ('0', BenchAction::Key(0)),
    ('1', BenchAction::Key(1)),
    ('2', BenchAction::Key(2)),
    ('3', BenchAction::Key(3)),
    ('4', BenchAction::Key(4)),
    ('5', BenchAction::Key(5)),
    ('6', BenchAction::Key(6)),
    ('7', BenchAction::Key(7)),
    ('8', BenchAction::Key(8)),
    ('9', BenchAction::Key(9)),
    ('r', BenchAction::ToggleModifier),
    ('k', BenchAction::ToggleScanning),
    ('q', BenchAction::Quit),
];

/// reads what the bench operator wants
pub trait BenchInput {
    /// everything asked for since the last call; never blocks
    fn poll_actions(&mut self) -> Result<Vec<BenchAction>, io::Error>;
}

/// keyboard input from the terminal, in raw mode for as long as it lives
pub struct TermInput {
    keymap: HashMap<char, BenchAction>,
}

impl TermInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: HashMap::from(BENCH_KEYMAP),
        })
    }

    fn map_key(&self, evt: KeyEvent) -> Option<BenchAction> {
        match evt.code {
            KeyCode::Esc => Some(BenchAction::Quit),
            KeyCode::Char('c') if evt.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(BenchAction::Quit)
            }
            KeyCode::Char(key) => self.keymap.get(&key.to_ascii_lowercase()).copied(),
            _ => None,
        }
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl BenchInput for TermInput {
    fn poll_actions(&mut self) -> Result<Vec<BenchAction>, io::Error> {
        let mut actions = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                match self.map_key(evt) {
                    Some(action) => actions.push(action),
                    None => debug!("unmapped key {:?}", evt.code),
                }
            }
        }
        Ok(actions)
    }
}

/// dummy BenchInput for testing: hands out one batch of actions per poll
pub struct ScriptedInput {
    batches: VecDeque<Vec<BenchAction>>,
}

impl ScriptedInput {
    pub fn new(batches: Vec<Vec<BenchAction>>) -> Self {
        ScriptedInput {
            batches: VecDeque::from(batches),
        }
    }
}

impl BenchInput for ScriptedInput {
    fn poll_actions(&mut self) -> Result<Vec<BenchAction>, io::Error> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}
