use std::io::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config::SHELL_NAME;

/// Writes log records to stderr, one line each.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        // \r keeps lines aligned if raw mode happens to be on
        let _ = write!(
            io::stderr(),
            "[{} {} {}] {}\r\n",
            SHELL_NAME,
            tag,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

pub fn init(level: LevelFilter) {
    // a second call only adjusts the level
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
