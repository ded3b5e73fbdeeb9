use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::info;

use crate::archive::ConversationArchiver;
use crate::responder::ResponderState;
use crate::response_store::ResponseStore;
use crate::transcript::Transcript;

/// Out-of-band session actions: archiving the current conversation and the
/// archive-then-reset "new conversation" flow.
pub struct SessionController {
    transcript: Arc<Transcript>,
    store: Arc<Mutex<ResponseStore>>,
    responder_state: Arc<ResponderState>,
    archiver: ConversationArchiver,
}

impl SessionController {
    pub fn new(
        transcript: Arc<Transcript>,
        store: Arc<Mutex<ResponseStore>>,
        responder_state: Arc<ResponderState>,
        archiver: ConversationArchiver,
    ) -> Self {
        Self {
            transcript,
            store,
            responder_state,
            archiver,
        }
    }

    /// Snapshot the transcript and formatted suggestions and write them to
    /// a timestamped archive file. I/O failures surface to the caller.
    pub fn save_current_conversation(&self) -> Result<PathBuf> {
        let transcript = self.transcript.snapshot();
        let suggestions = self.store.lock().unwrap().formatted();
        self.archiver.save(&transcript, &suggestions)
    }

    /// Archive the session, then clear all conversation state: transcript,
    /// accumulated suggestions, and the responder's latest-response slot.
    pub fn new_conversation(&self) -> Result<PathBuf> {
        let path = self.save_current_conversation()?;

        self.transcript.reset();
        self.store.lock().unwrap().clear();
        self.responder_state.clear_current_response();

        info!("Started new conversation (previous archived to {:?})", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Speaker;
    use std::fs;

    fn controller(dir: &std::path::Path) -> SessionController {
        let transcript = Arc::new(Transcript::new("You", "Them"));
        transcript.push(Speaker::Local, "hi");
        transcript.push(Speaker::Remote, "hello");

        let store = Arc::new(Mutex::new(ResponseStore::new()));
        store.lock().unwrap().add("first suggestion");

        let state = Arc::new(ResponderState::new(2));
        state.set_current_response("latest".to_string());

        SessionController::new(
            transcript,
            store,
            state,
            ConversationArchiver::new(dir.join("conversations")),
        )
    }

    #[test]
    fn test_save_writes_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let path = controller.save_current_conversation().unwrap();
        let content = fs::read_to_string(path).unwrap();

        assert!(content.contains("You: hi"));
        assert!(content.contains("Them: hello"));
        assert!(content.contains("first suggestion"));
    }

    #[test]
    fn test_new_conversation_archives_then_clears() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let path = controller.new_conversation().unwrap();
        assert!(path.exists());

        assert!(controller.transcript.is_empty());
        assert!(controller.store.lock().unwrap().is_empty());
        assert_eq!(controller.responder_state.current_response(), "");
    }

    #[test]
    fn test_new_conversation_fails_when_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        // Block directory creation with a plain file.
        fs::write(dir.path().join("conversations"), "blocker").unwrap();
        let controller = controller(dir.path());

        assert!(controller.new_conversation().is_err());
        // State is preserved when the archive could not be written.
        assert!(!controller.transcript.is_empty());
    }
}
