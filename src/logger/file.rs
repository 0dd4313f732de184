/// Plain-text log file persistence, one file per day under the logs directory
use super::config::get_logger_config;
use crate::paths;
use chrono::Local;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

struct LogFile {
    date: String,
    writer: BufWriter<File>,
}

static LOG_FILE: Lazy<Mutex<Option<LogFile>>> = Lazy::new(|| Mutex::new(None));

fn open_for_date(date: &str) -> Option<LogFile> {
    let path = paths::get_logs_dir().join(format!("coinvote_{}.log", date));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| eprintln!("Failed to open log file {}: {}", path.display(), e))
        .ok()?;

    Some(LogFile {
        date: date.to_string(),
        writer: BufWriter::new(file),
    })
}

pub fn init_file_logging() {
    if !get_logger_config().file_logging {
        return;
    }
    let today = Local::now().format("%Y-%m-%d").to_string();
    *LOG_FILE.lock() = open_for_date(&today);
}

pub fn write_to_file(line: &str) {
    let mut guard = LOG_FILE.lock();
    let Some(current) = guard.as_mut() else {
        return;
    };

    // Roll over at midnight
    let today = Local::now().format("%Y-%m-%d").to_string();
    if current.date != today {
        let _ = current.writer.flush();
        *guard = open_for_date(&today);
    }

    if let Some(current) = guard.as_mut() {
        let _ = writeln!(current.writer, "{}", line);
    }
}

pub fn flush_file_logging() {
    if let Some(current) = LOG_FILE.lock().as_mut() {
        let _ = current.writer.flush();
    }
}
