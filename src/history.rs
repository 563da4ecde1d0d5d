use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::session::Mode;

/// One row of the results log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub date: DateTime<Local>,
    pub mode: Mode,
    pub passage_chars: usize,
    pub elapsed_secs: f64,
    pub wpm: u32,
    pub accuracy: u32,
    pub errors: usize,
}

/// Append-only CSV log of finished sessions
#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new() -> Self {
        let path = AppDirs::results_path().unwrap_or_else(|| PathBuf::from("swiftkeys_results.csv"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &ResultEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        // New or empty (e.g. truncated) logs get a header
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    /// Last `n` entries, oldest first. A missing log is empty.
    pub fn recent(&self, n: usize) -> Result<Vec<ResultEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let entries = reader
            .deserialize::<ResultEntry>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

impl Default for ResultsLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(wpm: u32, mode: Mode) -> ResultEntry {
        ResultEntry {
            date: Local::now(),
            mode,
            passage_chars: 42,
            elapsed_secs: 12.5,
            wpm,
            accuracy: 97,
            errors: 1,
        }
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = tempdir().unwrap();
        let log = ResultsLog::with_path(dir.path().join("results.csv"));
        assert!(log.recent(5).unwrap().is_empty());
    }

    #[test]
    fn append_writes_single_header() {
        let dir = tempdir().unwrap();
        let log = ResultsLog::with_path(dir.path().join("results.csv"));
        log.append(&entry(40, Mode::Race)).unwrap();
        log.append(&entry(20, Mode::Lesson)).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().filter(|l| l.starts_with("date,")).count(), 1);
        assert_eq!(raw.lines().count(), 3);

        let rows = log.recent(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mode, Mode::Race);
        assert_eq!(rows[1].wpm, 20);
    }

    #[test]
    fn empty_existing_log_gets_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, b"").unwrap();

        let log = ResultsLog::with_path(&path);
        log.append(&entry(33, Mode::Race)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("date,"));
        let rows = log.recent(5).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].wpm, 33);
    }

    #[test]
    fn recent_keeps_newest() {
        let dir = tempdir().unwrap();
        let log = ResultsLog::with_path(dir.path().join("results.csv"));
        for wpm in 1..=5 {
            log.append(&entry(wpm, Mode::Race)).unwrap();
        }
        let rows = log.recent(2).unwrap();
        assert_eq!(rows.iter().map(|r| r.wpm).collect::<Vec<_>>(), vec![4, 5]);
    }
}
