//! Bounded polling for another window's result sheets.
//!
//! The file handoff reads the previous window's sheets from disk. The writer
//! renames complete files into place, so presence of every expected file is
//! enough to start reading.

use crate::error::HandoffError;
use circap_core::SheetName;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            interval: Duration::from_millis(200),
        }
    }
}

/// File names of `names` not yet present in `dir`.
pub fn missing_sheets(dir: &Path, names: &[SheetName]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.file_name())
        .filter(|f| !dir.join(f).is_file())
        .collect()
}

/// Block until every sheet in `names` exists in `dir`, or the timeout passes.
pub fn wait_for_sheets(
    dir: &Path,
    names: &[SheetName],
    poll: PollConfig,
) -> Result<(), HandoffError> {
    let start = Instant::now();
    loop {
        let missing = missing_sheets(dir, names);
        if missing.is_empty() {
            debug!(
                dir = %dir.display(),
                waited_ms = start.elapsed().as_millis() as u64,
                "sheets ready"
            );
            return Ok(());
        }
        let waited = start.elapsed();
        if waited >= poll.timeout {
            return Err(HandoffError::Timeout {
                dir: dir.to_path_buf(),
                waited,
                missing,
            });
        }
        debug!(dir = %dir.display(), missing = missing.len(), "waiting for sheets");
        thread::sleep(poll.interval.min(poll.timeout - waited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ready_sheets_return_immediately() {
        let dir = tempdir().unwrap();
        for name in SheetName::CARRY_OVER {
            fs::write(dir.path().join(name.file_name()), "year\n").unwrap();
        }
        wait_for_sheets(dir.path(), &SheetName::CARRY_OVER, PollConfig::default()).unwrap();
    }

    #[test]
    fn test_timeout_names_missing_sheets() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("decom.csv"), "year\n").unwrap();
        let poll = PollConfig {
            timeout: Duration::from_millis(30),
            interval: Duration::from_millis(10),
        };
        let err = wait_for_sheets(dir.path(), &[SheetName::Decom, SheetName::Scrap], poll)
            .unwrap_err();
        let HandoffError::Timeout { missing, waited, .. } = err;
        assert_eq!(missing, vec!["scrap.csv".to_string()]);
        assert!(waited >= Duration::from_millis(30));
    }

    #[test]
    fn test_sheet_written_while_waiting_is_picked_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scrap.csv");
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            fs::write(path, "year\n").unwrap();
        });
        let poll = PollConfig {
            timeout: Duration::from_secs(5),
            interval: Duration::from_millis(5),
        };
        wait_for_sheets(dir.path(), &[SheetName::Scrap], poll).unwrap();
        writer.join().unwrap();
    }
}
