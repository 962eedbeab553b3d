//! The library log sink: a severity-filtered `log` backend writing
//! `[YYYY-MM-DD HH:MM:SS] LEVEL: msg` to standard error, or to a
//! caller-provided callback.
use std::sync::Arc;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};

use glint_model::{Error, ErrorKind, Result};

/// Replaces the default stderr writer. Receives the severity and the
/// formatted message.
pub type LogCallback = Arc<dyn Fn(Level, &str) + Send + Sync>;

struct Sink {
    level: LevelFilter,
    callback: Option<LogCallback>,
}

impl Log for Sink {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        match &self.callback {
            Some(callback) => callback(record.level(), &message),
            None => eprintln!(
                "[{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ),
        }
    }

    fn flush(&self) {}
}

/// Installs the sink as the process logger. Fails when another logger is
/// already registered.
pub fn init(level: LevelFilter, callback: Option<LogCallback>) -> Result<()> {
    log::set_boxed_logger(Box::new(Sink { level, callback }))
        .map(|()| log::set_max_level(level))
        .map_err(|_| Error::new(ErrorKind::InvalidState, "a logger is already installed"))
}
