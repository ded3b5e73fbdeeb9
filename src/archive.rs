use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;

const BANNER_WIDTH: usize = 50;
const TRANSCRIPT_TITLE: &str = "CONVERSATION TRANSCRIPT";
const SUGGESTIONS_TITLE: &str = "AI SUGGESTIONS";

/// Writes conversation snapshots to timestamped text files under a session
/// directory. Saves are manual or shutdown-triggered; two saves within the
/// same second share a filename and the last write wins.
pub struct ConversationArchiver {
    save_dir: PathBuf,
}

impl ConversationArchiver {
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
        }
    }

    /// Save a transcript plus formatted suggestions. Returns the written
    /// path; directory or file I/O problems surface to the caller.
    pub fn save(&self, transcript: &str, suggestions: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.save_dir).with_context(|| {
            format!("Failed to create session directory {:?}", self.save_dir)
        })?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let file_path = self.save_dir.join(format!("conversation_{}.txt", timestamp));

        let banner = "=".repeat(BANNER_WIDTH);
        let content = format!(
            "{banner}\n{TRANSCRIPT_TITLE}\n{banner}\n\n{transcript}\n\n{banner}\n{SUGGESTIONS_TITLE}\n{banner}\n\n{suggestions}",
        );

        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write conversation file {:?}", file_path))?;

        debug!("Saved conversation: {:?}", file_path);
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_fixed_format() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ConversationArchiver::new(dir.path().join("conversations"));

        let path = archiver.save("Siz: hi", "sug1").unwrap();
        let content = fs::read_to_string(&path).unwrap();

        let banner = "=".repeat(50);
        let expected = format!(
            "{banner}\nCONVERSATION TRANSCRIPT\n{banner}\n\nSiz: hi\n\n{banner}\nAI SUGGESTIONS\n{banner}\n\nsug1"
        );
        assert_eq!(content, expected);
    }

    #[test]
    fn test_filename_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ConversationArchiver::new(dir.path());

        let path = archiver.save("t", "s").unwrap();
        let name = path.file_name().unwrap().to_string_lossy();

        assert!(name.starts_with("conversation_"));
        assert!(name.ends_with(".txt"));
        // conversation_YYYYMMDD_HHMMSS.txt
        assert_eq!(name.len(), "conversation_00000000_000000.txt".len());
    }

    #[test]
    fn test_save_creates_directory_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let archiver = ConversationArchiver::new(dir.path().join("nested").join("sessions"));

        archiver.save("a", "b").unwrap();
        archiver.save("c", "d").unwrap();
    }

    #[test]
    fn test_save_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("conversations");
        fs::write(&blocker, "not a directory").unwrap();

        let archiver = ConversationArchiver::new(&blocker);
        assert!(archiver.save("a", "b").is_err());
    }
}
