//! Notification banners shown alongside a patient's progress
//!
//! The notification file maps a branch code to a list of entries. The entry
//! coded `branch` is the branch-wide banner; an entry coded with a queue
//! letter applies to every queue number starting with that letter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Code of the branch-wide banner entry
pub const BRANCH_BANNER_CODE: &str = "branch";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Notification {
    pub code: String,
    pub text: String,
}

/// Banners resolved for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Banners {
    pub branch: Option<String>,
    pub queue: Option<String>,
}

/// Notification file, re-read on each lookup so edits show up immediately
pub struct NotificationBoard {
    path: PathBuf,
}

impl NotificationBoard {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    /// Banners for a branch and queue letter; a missing or unreadable file
    /// means no banners
    pub fn banners(&self, branch_code: &str, queue_code: &str) -> Banners {
        let all = match self.read() {
            Ok(all) => all,
            Err(reason) => {
                debug!(file = %self.path.display(), reason = %reason, "notifications_unavailable");
                return Banners::default();
            }
        };

        let mut banners = Banners::default();
        for entry in all.get(branch_code).into_iter().flatten() {
            if entry.code == BRANCH_BANNER_CODE {
                banners.branch = Some(entry.text.clone());
            } else if entry.code == queue_code {
                banners.queue = Some(entry.text.clone());
            }
        }
        banners
    }

    fn read(&self) -> Result<HashMap<String, Vec<Notification>>, String> {
        let content = fs::read_to_string(&self.path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_banners() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "kbj": [
                    {{"code": "branch", "text": "Poli tutup pukul 14.00"}},
                    {{"code": "A", "text": "Antrian A menuju lantai 2"}}
                ],
                "smg": [{{"code": "branch", "text": "other"}}]
            }}"#
        )
        .unwrap();
        file.flush().unwrap();

        let board = NotificationBoard::new(file.path());
        let banners = board.banners("kbj", "A");
        assert_eq!(banners.branch.as_deref(), Some("Poli tutup pukul 14.00"));
        assert_eq!(banners.queue.as_deref(), Some("Antrian A menuju lantai 2"));

        let banners = board.banners("kbj", "B");
        assert!(banners.queue.is_none());

        assert_eq!(board.banners("xyz", "A"), Banners::default());
    }

    #[test]
    fn test_missing_file_means_no_banners() {
        let board = NotificationBoard::new("/nonexistent/notification.json");
        assert_eq!(board.banners("kbj", "A"), Banners::default());
    }
}
