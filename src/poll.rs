use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::display::{self, DisplaySurface, TranscriptView};
use crate::markdown;
use crate::responder::ResponderState;
use crate::response_store::ResponseStore;
use crate::settings::{MAX_RESPONSE_INTERVAL_SECS, MIN_RESPONSE_INTERVAL_SECS};
use crate::transcript::Transcript;

/// Display refresh period for both panes.
const POLL_TICK: Duration = Duration::from_millis(300);

/// The thin user-facing controls: a pause toggle for the suggestion pane
/// and the interval selector. Both are latest-value cells read once per
/// tick.
pub struct UiControls {
    paused: AtomicBool,
    interval_secs: AtomicU64,
}

impl UiControls {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            interval_secs: AtomicU64::new(clamp_interval(interval_secs)),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Flip the pause flag; returns the new value.
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn set_interval_secs(&self, secs: u64) {
        self.interval_secs
            .store(clamp_interval(secs), Ordering::Relaxed);
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }
}

fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_RESPONSE_INTERVAL_SECS, MAX_RESPONSE_INTERVAL_SECS)
}

/// Drives the two display panes on fixed-period ticker threads with
/// explicit start/stop. Ticks never block on the network; they only read
/// the latest-value cells the responder maintains.
pub struct PollDriver {
    transcript: Arc<Transcript>,
    responder_state: Arc<ResponderState>,
    store: Arc<Mutex<ResponseStore>>,
    controls: Arc<UiControls>,
    suggestion_surface: Arc<dyn DisplaySurface>,
    transcript_view: Arc<dyn TranscriptView>,
    is_active: Arc<AtomicBool>,
    worker_handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl PollDriver {
    pub fn new(
        transcript: Arc<Transcript>,
        responder_state: Arc<ResponderState>,
        store: Arc<Mutex<ResponseStore>>,
        controls: Arc<UiControls>,
        suggestion_surface: Arc<dyn DisplaySurface>,
        transcript_view: Arc<dyn TranscriptView>,
    ) -> Self {
        Self {
            transcript,
            responder_state,
            store,
            controls,
            suggestion_surface,
            transcript_view,
            is_active: Arc::new(AtomicBool::new(false)),
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn start(&self) {
        if self.is_active.load(Ordering::Relaxed) {
            debug!("Poll driver already active");
            return;
        }

        self.is_active.store(true, Ordering::Relaxed);
        info!("Starting display poll loops");

        let mut handles = self.worker_handles.lock().unwrap();

        {
            let is_active = Arc::clone(&self.is_active);
            let state = Arc::clone(&self.responder_state);
            let store = Arc::clone(&self.store);
            let controls = Arc::clone(&self.controls);
            let surface = Arc::clone(&self.suggestion_surface);
            handles.push(thread::spawn(move || {
                while is_active.load(Ordering::Relaxed) {
                    thread::sleep(POLL_TICK);
                    if !is_active.load(Ordering::Relaxed) {
                        break;
                    }
                    suggestion_tick(&state, &store, &controls, surface.as_ref());
                }
            }));
        }

        {
            let is_active = Arc::clone(&self.is_active);
            let transcript = Arc::clone(&self.transcript);
            let view = Arc::clone(&self.transcript_view);
            handles.push(thread::spawn(move || {
                while is_active.load(Ordering::Relaxed) {
                    thread::sleep(POLL_TICK);
                    if !is_active.load(Ordering::Relaxed) {
                        break;
                    }
                    transcript_tick(&transcript, view.as_ref());
                }
            }));
        }
    }

    pub fn stop(&self) {
        if !self.is_active.load(Ordering::Relaxed) {
            return;
        }

        info!("Stopping display poll loops");
        self.is_active.store(false, Ordering::Relaxed);

        for handle in self.worker_handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for PollDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One suggestion-pane tick: pull the latest response into the store,
/// re-render the accumulated history, and push the configured interval to
/// the responder. Paused means all three steps are skipped; the ticker
/// keeps running so resuming takes effect on the next tick.
fn suggestion_tick(
    state: &ResponderState,
    store: &Mutex<ResponseStore>,
    controls: &UiControls,
    surface: &dyn DisplaySurface,
) {
    if controls.is_paused() {
        return;
    }

    let latest = state.current_response();
    let formatted = {
        let mut store = store.lock().unwrap();
        store.add(&latest);
        store.formatted()
    };
    markdown::render_to(&formatted, surface);

    state.update_response_interval(controls.interval_secs());
}

/// One transcript-pane tick: snapshot and repaint speaker-styled segments.
fn transcript_tick(transcript: &Transcript, view: &dyn TranscriptView) {
    let snapshot = transcript.snapshot();
    let segments = display::transcript_segments(
        &snapshot,
        transcript.local_label(),
        transcript.remote_label(),
    );
    view.replace(segments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{SpeakerStyle, TranscriptSegment};
    use crate::markdown::{RunStyle, StyledRun};
    use crate::transcript::Speaker;

    #[derive(Default)]
    struct RecordingSurface {
        frames: Mutex<Vec<Vec<StyledRun>>>,
    }

    impl DisplaySurface for RecordingSurface {
        fn replace(&self, runs: Vec<StyledRun>) {
            self.frames.lock().unwrap().push(runs);
        }
    }

    #[derive(Default)]
    struct RecordingView {
        frames: Mutex<Vec<Vec<TranscriptSegment>>>,
    }

    impl TranscriptView for RecordingView {
        fn replace(&self, segments: Vec<TranscriptSegment>) {
            self.frames.lock().unwrap().push(segments);
        }
    }

    fn state_with_response(response: &str) -> Arc<ResponderState> {
        let state = Arc::new(ResponderState::new(2));
        state.set_current_response(response.to_string());
        state
    }

    #[test]
    fn test_tick_pulls_response_and_renders() {
        let state = state_with_response("fresh suggestion");
        let store = Mutex::new(ResponseStore::new());
        let controls = UiControls::new(2);
        let surface = RecordingSurface::default();

        suggestion_tick(&state, &store, &controls, &surface);

        assert_eq!(store.lock().unwrap().len(), 1);
        let frames = surface.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0]
            .iter()
            .any(|run| run.style == RunStyle::Plain && run.text == "fresh suggestion"));
    }

    #[test]
    fn test_tick_dedupes_repeated_response() {
        let state = state_with_response("same");
        let store = Mutex::new(ResponseStore::new());
        let controls = UiControls::new(2);
        let surface = RecordingSurface::default();

        suggestion_tick(&state, &store, &controls, &surface);
        suggestion_tick(&state, &store, &controls, &surface);

        // Rendered twice, stored once.
        assert_eq!(store.lock().unwrap().len(), 1);
        assert_eq!(surface.frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_pause_freezes_all_tick_steps() {
        let state = state_with_response("while paused");
        let store = Mutex::new(ResponseStore::new());
        let controls = UiControls::new(2);
        let surface = RecordingSurface::default();

        controls.toggle_paused();
        controls.set_interval_secs(5);
        suggestion_tick(&state, &store, &controls, &surface);

        assert!(store.lock().unwrap().is_empty());
        assert!(surface.frames.lock().unwrap().is_empty());
        // The interval push is frozen too.
        assert_eq!(state.response_interval_secs(), 2);

        controls.toggle_paused();
        suggestion_tick(&state, &store, &controls, &surface);

        assert_eq!(store.lock().unwrap().len(), 1);
        assert_eq!(state.response_interval_secs(), 5);
    }

    #[test]
    fn test_tick_pushes_interval_to_responder() {
        let state = state_with_response("x");
        let store = Mutex::new(ResponseStore::new());
        let controls = UiControls::new(2);
        let surface = RecordingSurface::default();

        controls.set_interval_secs(9);
        suggestion_tick(&state, &store, &controls, &surface);

        assert_eq!(state.response_interval_secs(), 9);
    }

    #[test]
    fn test_controls_clamp_interval() {
        let controls = UiControls::new(42);
        assert_eq!(controls.interval_secs(), MAX_RESPONSE_INTERVAL_SECS);
        controls.set_interval_secs(0);
        assert_eq!(controls.interval_secs(), MIN_RESPONSE_INTERVAL_SECS);
    }

    #[test]
    fn test_transcript_tick_paints_speaker_styles() {
        let transcript = Transcript::new("You", "Them");
        transcript.push(Speaker::Local, "hi");
        transcript.push(Speaker::Remote, "hello");
        let view = RecordingView::default();

        transcript_tick(&transcript, &view);

        let frames = view.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0][0].style, SpeakerStyle::Local);
        assert_eq!(frames[0][1].style, SpeakerStyle::Remote);
    }
}
