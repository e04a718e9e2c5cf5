//! Append-only trial log
//!
//! One line per entry: `Trial N: V` for a completed trial, `ERROR: message`
//! for a surfaced error. Files are named after the local time the session
//! started.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix of the trial log
pub const TRIAL_LOG_PREFIX: &str = "Log_";
/// File name prefix of the diagnostic log
pub const DEBUG_LOG_PREFIX: &str = "DEBUG_Log_";

#[derive(Debug, Error)]
pub enum TrialLogError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to write to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// A single log line
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Trial { iteration: u64, value_ms: f64 },
    Error { message: String },
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial {
                iteration,
                value_ms,
            } => write!(f, "Trial {}: {:.6}", iteration, value_ms),
            Self::Error { message } => write!(f, "ERROR: {}", message),
        }
    }
}

/// `<prefix>YYYYMMDDHHMMSS.log`
pub fn log_file_name(prefix: &str, started: &DateTime<Local>) -> String {
    format!("{}{}.log", prefix, started.format("%Y%m%d%H%M%S"))
}

/// Create `dir` if needed and open a fresh log file in it for appending
pub fn create_log_file(
    dir: &Path,
    prefix: &str,
    started: &DateTime<Local>,
) -> Result<(PathBuf, File), TrialLogError> {
    fs::create_dir_all(dir).map_err(|source| TrialLogError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(log_file_name(prefix, started));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| TrialLogError::Open {
            path: path.clone(),
            source,
        })?;
    Ok((path, file))
}

/// Writer for the trial log
#[derive(Debug)]
pub struct TrialLog {
    path: PathBuf,
    file: File,
    entries: u64,
}

impl TrialLog {
    /// Open a new log in `dir` named after the current local time
    pub fn create(dir: &Path) -> Result<Self, TrialLogError> {
        Self::create_at(dir, &Local::now())
    }

    pub fn create_at(dir: &Path, started: &DateTime<Local>) -> Result<Self, TrialLogError> {
        let (path, file) = create_log_file(dir, TRIAL_LOG_PREFIX, started)?;
        log::info!("trial log: {}", path.display());
        Ok(Self {
            path,
            file,
            entries: 0,
        })
    }

    /// Append one entry. Each line reaches the file before this returns.
    pub fn append(&mut self, entry: &LogEntry) -> Result<(), TrialLogError> {
        writeln!(self.file, "{}", entry)
            .and_then(|_| self.file.flush())
            .map_err(|source| TrialLogError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.entries += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;

    fn temp_log_dir(name: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "reaction-time-tester-log-{}-{}",
            name,
            std::process::id()
        ))
    }

    fn session_start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn entry_lines() {
        let trial = LogEntry::Trial {
            iteration: 3,
            value_ms: 251.25,
        };
        assert_eq!(trial.to_string(), "Trial 3: 251.250000");

        let error = LogEntry::Error {
            message: "timer queue full".to_string(),
        };
        assert_eq!(error.to_string(), "ERROR: timer queue full");
    }

    #[test]
    fn file_names_use_session_start() {
        assert_eq!(
            log_file_name(TRIAL_LOG_PREFIX, &session_start()),
            "Log_20240309140507.log"
        );
        assert_eq!(
            log_file_name(DEBUG_LOG_PREFIX, &session_start()),
            "DEBUG_Log_20240309140507.log"
        );
    }

    #[test]
    fn append_writes_lines_in_order() {
        let dir = temp_log_dir("append");
        let mut log = TrialLog::create_at(&dir, &session_start()).unwrap();
        log.append(&LogEntry::Trial {
            iteration: 1,
            value_ms: 200.0,
        })
        .unwrap();
        log.append(&LogEntry::Error {
            message: "oops".to_string(),
        })
        .unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "Trial 1: 200.000000\nERROR: oops\n");
        assert_eq!(log.entries(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_fails_when_dir_is_a_file() {
        let blocker = temp_log_dir("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = TrialLog::create(&blocker.join("logs")).unwrap_err();
        assert!(matches!(err, TrialLogError::CreateDir { .. }));

        let _ = fs::remove_file(&blocker);
    }
}
