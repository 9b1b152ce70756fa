//! File logger behind the `log` facade.
//!
//! Every record is appended to a per-user log file as
//! `YYYY-MM-DD HH:MM:SS - LEVEL - message` and mirrored over a channel to
//! the UI log display. The file path and level filter can change at
//! runtime; clearing truncates the file to zero bytes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// One formatted line, mirrored to the UI display sink.
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub text: String,
}

pub struct FileLogger {
    inner: Mutex<Inner>,
    mirror: Sender<LogLine>,
}

struct Inner {
    path: PathBuf,
    file: Option<File>,
    level: LevelFilter,
}

impl FileLogger {
    pub fn new(path: PathBuf, level: LevelFilter, mirror: Sender<LogLine>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                path,
                file: None,
                level,
            }),
            mirror,
        }
    }

    /// Format, append to the file, and mirror to the display sink.
    /// File write problems fall back to stderr rather than being swallowed.
    pub fn append(&self, level: Level, message: &str) {
        let line = format!(
            "{} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            level_tag(level),
            message
        );

        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.level >= level {
            if let Err(e) = inner.write_line(&line) {
                eprintln!("log write failed: {e}");
            }
            let _ = self.mirror.send(LogLine {
                level,
                text: line,
            });
        }
    }

    pub fn path(&self) -> PathBuf {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).path.clone()
    }

    /// Point the logger at a new file; subsequent lines go there.
    pub fn set_path(&self, path: PathBuf) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.path = path;
        inner.file = None;
    }

    pub fn set_level(&self, level: LevelFilter) {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).level = level;
        log::set_max_level(level);
    }

    /// Truncate the backing file to zero bytes.
    pub fn clear_file(&self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.file = Some(open_log_file(&inner.path, true)?);
        Ok(())
    }
}

impl Inner {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if self.file.is_none() {
            self.file = Some(open_log_file(&self.path, false)?);
        }
        let file = self.file.as_mut().expect("file opened above");
        writeln!(file, "{line}")?;
        file.flush()
    }
}

fn open_log_file(path: &PathBuf, truncate: bool) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(!truncate)
        .write(true)
        .truncate(truncate)
        .open(path)
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "DEBUG",
    }
}

/// Adapter installed into the `log` facade; only this crate's records are
/// mirrored into the UI.
struct LoggerHandle(Arc<FileLogger>);

impl Log for LoggerHandle {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.0.append(record.level(), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}

pub fn default_log_path() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("/Users/unknown"))
        .join("Library")
        .join("Logs")
        .join("DockUpdater")
        .join("dock_updater.log")
}

/// Build the shared logger and install it behind the `log` facade. Keeps
/// running on install failure (for example a second init in tests) since
/// logging is not worth crashing the app for.
pub fn init(path: PathBuf, level: LevelFilter, mirror: Sender<LogLine>) -> Arc<FileLogger> {
    let logger = Arc::new(FileLogger::new(path, level, mirror));
    if let Err(e) = log::set_boxed_logger(Box::new(LoggerHandle(logger.clone()))) {
        eprintln!("could not install logger: {e}");
    }
    log::set_max_level(level);
    logger
}
