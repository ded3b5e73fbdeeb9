use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

/// Closed set of conversation parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Local,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

/// Edge-triggered change notification with clear-on-observe semantics.
///
/// A burst of notifications between two observations collapses into one;
/// observing and clearing happen under the same lock so a notification can
/// never fall between check and clear.
pub struct ChangeSignal {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl ChangeSignal {
    fn new() -> Self {
        Self {
            fired: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        let mut fired = self.fired.lock().unwrap();
        *fired = true;
        self.cond.notify_one();
    }

    /// Block until the signal fires or `timeout` elapses. Returns whether it
    /// fired; a fired signal is cleared before returning.
    pub fn wait_and_clear(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut fired = self.fired.lock().unwrap();

        loop {
            if *fired {
                *fired = false;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.cond.wait_timeout(fired, deadline - now).unwrap();
            fired = guard;
        }
    }
}

/// Append-only utterance store shared between the (external) transcription
/// producer and the fetch/poll consumers. Snapshots are taken under the lock
/// so they always reflect whole utterances, never partial writes.
pub struct Transcript {
    utterances: Mutex<Vec<Utterance>>,
    changed: ChangeSignal,
    local_label: String,
    remote_label: String,
}

impl Transcript {
    pub fn new(local_label: impl Into<String>, remote_label: impl Into<String>) -> Self {
        Self {
            utterances: Mutex::new(Vec::new()),
            changed: ChangeSignal::new(),
            local_label: local_label.into(),
            remote_label: remote_label.into(),
        }
    }

    /// Append an utterance and fire the change signal. Blank text is
    /// dropped; the transcription pipeline occasionally emits it for
    /// silence.
    pub fn push(&self, speaker: Speaker, text: &str) {
        if text.trim().is_empty() {
            debug!("Dropping blank utterance for {:?}", speaker);
            return;
        }

        self.utterances.lock().unwrap().push(Utterance {
            speaker,
            text: text.trim().to_string(),
        });
        self.changed.notify();
    }

    /// Full-text snapshot in display form: `<Label>: <text>` per utterance,
    /// blank-line separated.
    pub fn snapshot(&self) -> String {
        let utterances = self.utterances.lock().unwrap();
        utterances
            .iter()
            .map(|u| format!("{}: {}", self.label_for(u.speaker), u.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Discard all utterances. Used by the "new conversation" reset.
    pub fn reset(&self) {
        self.utterances.lock().unwrap().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.lock().unwrap().is_empty()
    }

    pub fn changed(&self) -> &ChangeSignal {
        &self.changed
    }

    pub fn local_label(&self) -> &str {
        &self.local_label
    }

    pub fn remote_label(&self) -> &str {
        &self.remote_label
    }

    fn label_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Local => &self.local_label,
            Speaker::Remote => &self.remote_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_format() {
        let transcript = Transcript::new("You", "Them");
        transcript.push(Speaker::Local, "hi");
        transcript.push(Speaker::Remote, "hello");

        assert_eq!(transcript.snapshot(), "You: hi\n\nThem: hello");
    }

    #[test]
    fn test_push_ignores_blank_text() {
        let transcript = Transcript::new("You", "Them");
        transcript.push(Speaker::Local, "   ");
        assert!(transcript.is_empty());
        assert_eq!(transcript.snapshot(), "");
    }

    #[test]
    fn test_reset_discards_utterances() {
        let transcript = Transcript::new("You", "Them");
        transcript.push(Speaker::Local, "hi");
        transcript.reset();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_change_signal_fires_on_push() {
        let transcript = Transcript::new("You", "Them");
        transcript.push(Speaker::Local, "hi");
        assert!(transcript.changed().wait_and_clear(Duration::from_millis(10)));
    }

    #[test]
    fn test_change_signal_collapses_bursts() {
        let signal = ChangeSignal::new();
        signal.notify();
        signal.notify();
        signal.notify();

        assert!(signal.wait_and_clear(Duration::from_millis(10)));
        // The burst was observed once; the signal is clear again.
        assert!(!signal.wait_and_clear(Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_times_out_without_signal() {
        let signal = ChangeSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_and_clear(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_notify_wakes_waiting_thread() {
        use std::sync::Arc;
        use std::thread;

        let signal = Arc::new(ChangeSignal::new());
        let waiter = Arc::clone(&signal);
        let handle =
            thread::spawn(move || waiter.wait_and_clear(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(20));
        signal.notify();
        assert!(handle.join().unwrap());
    }
}
