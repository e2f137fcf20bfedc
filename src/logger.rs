//! Diagnostic-channel logger.
//!
//! Every log line goes to stderr, which is the worker's diagnostic channel:
//! the parent inherits it and the result channel never sees it. An optional
//! file copy can be enabled with `AUDIOGEN_LOG_FILE` for post-mortem reading.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct Logger {
    file: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(log_path: Option<&str>) -> Self {
        let file = log_path.and_then(|p| open_log_file(p).map(Mutex::new));
        Logger { file }
    }

    pub fn log(&self, level: &str, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let log_line = format!("[{timestamp}] [{level}] {message}\n");

        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(log_line.as_bytes());
        let _ = stderr.flush();

        if let Some(ref file) = self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.write_all(log_line.as_bytes());
                let _ = file.flush();
            }
        }
    }

    pub fn debug(&self, message: &str) {
        self.log("DEBUG", message);
    }

    pub fn info(&self, message: &str) {
        self.log("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        self.log("WARN", message);
    }

    pub fn error(&self, message: &str) {
        self.log("ERROR", message);
    }
}

fn open_log_file(log_path: &str) -> Option<File> {
    if let Some(parent) = Path::new(log_path).parent() {
        std::fs::create_dir_all(parent).ok()?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()
}

// Global logger instance
lazy_static::lazy_static! {
    pub static ref LOGGER: Logger =
        Logger::new(std::env::var("AUDIOGEN_LOG_FILE").ok().as_deref());
}

// Convenience macros
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.debug(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.info(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.warn(&format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::LOGGER.error(&format!($($arg)*));
    };
}
