use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// keeps the last few diagnostic lines in memory, for showing on screen
/// where stderr is not an option
pub struct RingLog {
    capacity: usize,
    level: LevelFilter,
    lines: Mutex<VecDeque<String>>,
}

impl RingLog {
    pub fn new(capacity: usize, level: LevelFilter) -> Self {
        RingLog {
            capacity,
            level,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// make a ring log the global logger. it lives for the rest of the
    /// process
    pub fn install(capacity: usize, level: LevelFilter) -> Result<&'static RingLog> {
        let ring: &'static RingLog = Box::leak(Box::new(RingLog::new(capacity, level)));
        log::set_logger(ring)?;
        log::set_max_level(level);
        Ok(ring)
    }

    /// oldest first
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.iter().cloned().collect()
    }
}

impl Log for RingLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) || self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(format!("{:<5} {}", record.level(), record.args()));
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn emit(ring: &RingLog, level: Level, msg: &str) {
        ring.log(
            &Record::builder()
                .args(format_args!("{}", msg))
                .level(level)
                .build(),
        );
    }

    #[test]
    fn test_keeps_newest() {
        let ring = RingLog::new(2, LevelFilter::Info);
        emit(&ring, Level::Info, "one");
        emit(&ring, Level::Info, "two");
        emit(&ring, Level::Warn, "three");
        assert_eq!(ring.lines(), vec!["INFO  two", "WARN  three"]);
    }

    #[test]
    fn test_filters_level() {
        let ring = RingLog::new(4, LevelFilter::Info);
        emit(&ring, Level::Debug, "chatter");
        assert!(ring.lines().is_empty());
    }

    #[test]
    fn test_zero_capacity() {
        let ring = RingLog::new(0, LevelFilter::Trace);
        emit(&ring, Level::Error, "dropped");
        assert!(ring.lines().is_empty());
    }
}
