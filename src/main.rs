use log::LevelFilter;
use std::error::Error;

use romswitch::bench::Bench;
use romswitch::config::Timing;
use romswitch::controller::Controller;
use romswitch::diag::RingLog;
use romswitch::display::TermStatusView;
use romswitch::input::TermInput;
use romswitch::keys::KeyMailbox;
use romswitch::lines::BenchLines;
use romswitch::sequencer::SpinDelay;
use romswitch::store::{FileStore, DEFAULT_STORE_SIZE};

/// where the bench keeps its EEPROM between runs
const EEPROM_IMAGE: &str = "romswitch.eeprom";

/// diagnostic lines kept for the status panel
const LOG_LINES: usize = 12;

static MAILBOX: KeyMailbox = KeyMailbox::new();

fn main() -> Result<(), Box<dyn Error>> {
    // initialise
    let timing = match std::env::args().nth(1) {
        Some(path) => Timing::from_json_file(path)?,
        None => Timing::default(),
    };
    let log = RingLog::install(LOG_LINES, LevelFilter::Info)?;
    let mut store = FileStore::open(EEPROM_IMAGE, DEFAULT_STORE_SIZE)?;
    let lines = BenchLines::new();
    let mut delay = SpinDelay::new();
    let mut input = TermInput::new()?;
    let mut view = TermStatusView::new()?;

    // the controller gets its own handle on the board; the bench keeps one to
    // press keys and watch the outputs
    let mut driver = lines.clone();
    let mut controller = Controller::boot(&mut driver, &mut store, &mut delay, &MAILBOX, timing);
    let ticks = Bench::new(lines, &MAILBOX, &mut input, &mut view)
        .with_log(log)
        .run(&mut controller, None)?;

    // leave the prompt below the last frame
    drop(input);
    println!("\nstopped after {} ticks", ticks);
    Ok(())
}
