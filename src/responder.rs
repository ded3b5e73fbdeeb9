use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use tokio::sync::Notify;

use crate::llm_client::{FetchError, SuggestionClient};
use crate::transcript::Transcript;

/// Placeholder suggestion shown until the first fetch lands.
pub const INITIAL_RESPONSE: &str = "Start the conversation to see suggestions here.";

/// Idle tick while no transcript change is pending.
const IDLE_TICK: Duration = Duration::from_millis(300);

/// Source of suggestions for a transcript snapshot. The production
/// implementation is `SuggestionClient`; tests script their own.
pub trait SuggestionProvider: Send + Sync {
    fn generate(&self, transcript: &str)
        -> impl Future<Output = Result<String, FetchError>>;
}

impl SuggestionProvider for SuggestionClient {
    fn generate(
        &self,
        transcript: &str,
    ) -> impl Future<Output = Result<String, FetchError>> {
        self.fetch_suggestion(transcript)
    }
}

/// State shared between the fetch loop and the poll loop: the latest
/// accepted suggestion and the fetch interval. Both are single-slot
/// latest-value cells, cross-assigned (the fetcher writes the response and
/// reads the interval; the poll loop does the reverse).
pub struct ResponderState {
    current_response: Mutex<String>,
    interval_secs: AtomicU64,
}

impl ResponderState {
    pub(crate) fn new(interval_secs: u64) -> Self {
        Self {
            current_response: Mutex::new(INITIAL_RESPONSE.to_string()),
            interval_secs: AtomicU64::new(interval_secs.max(1)),
        }
    }

    pub fn current_response(&self) -> String {
        self.current_response.lock().unwrap().clone()
    }

    pub(crate) fn set_current_response(&self, text: String) {
        *self.current_response.lock().unwrap() = text;
    }

    /// Reset the slot for a new conversation.
    pub fn clear_current_response(&self) {
        *self.current_response.lock().unwrap() = String::new();
    }

    /// Replace the fetch interval; takes effect on the next cycle boundary.
    pub fn update_response_interval(&self, secs: u64) {
        self.interval_secs.store(secs.max(1), Ordering::Relaxed);
    }

    pub fn response_interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }
}

/// Runs the suggestion fetch loop on a dedicated worker thread.
pub struct ResponderManager {
    state: Arc<ResponderState>,
    client: Arc<SuggestionClient>,
    is_active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    worker_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ResponderManager {
    pub fn new(client: SuggestionClient, interval_secs: u64) -> Self {
        Self {
            state: Arc::new(ResponderState::new(interval_secs)),
            client: Arc::new(client),
            is_active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            worker_handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> Arc<ResponderState> {
        Arc::clone(&self.state)
    }

    /// Start the fetch loop against the given transcript source.
    pub fn start(&self, transcript: Arc<Transcript>) {
        if self.is_active.load(Ordering::Relaxed) {
            debug!("Responder already active");
            return;
        }

        self.is_active.store(true, Ordering::Relaxed);
        info!("Starting suggestion responder");

        let state = Arc::clone(&self.state);
        let client = Arc::clone(&self.client);
        let is_active = Arc::clone(&self.is_active);
        let shutdown = Arc::clone(&self.shutdown);

        let handle = thread::spawn(move || {
            run_fetch_loop(state, client, transcript, is_active, shutdown);
        });

        *self.worker_handle.lock().unwrap() = Some(handle);
    }

    /// Stop the fetch loop, interrupting an in-flight request or interval
    /// sleep, and join the worker.
    pub fn stop(&self) {
        if !self.is_active.load(Ordering::Relaxed) {
            return;
        }

        info!("Stopping suggestion responder");
        self.is_active.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();

        if let Some(handle) = self.worker_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

impl Drop for ResponderManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One fetch cycle per observed transcript change, spaced at least the
/// configured interval apart. A slow upstream call stretches the cycle (the
/// cadence is rate-limited, not rate-buffered); a failed call leaves the
/// current response untouched.
fn run_fetch_loop<P: SuggestionProvider>(
    state: Arc<ResponderState>,
    provider: Arc<P>,
    transcript: Arc<Transcript>,
    is_active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build fetch runtime: {}", e);
            is_active.store(false, Ordering::Relaxed);
            return;
        }
    };

    while is_active.load(Ordering::Relaxed) {
        if !transcript.changed().wait_and_clear(IDLE_TICK) {
            continue;
        }

        let cycle_start = Instant::now();
        let snapshot = transcript.snapshot();

        let result = runtime.block_on(async {
            tokio::select! {
                result = provider.generate(&snapshot) => Some(result),
                _ = shutdown.notified() => None,
            }
        });

        match result {
            Some(Ok(text)) => state.set_current_response(text),
            Some(Err(e)) => debug!("Suggestion fetch failed: {}", e),
            // Shutdown interrupted the in-flight request.
            None => break,
        }

        let interval = Duration::from_secs(state.response_interval_secs());
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            let interrupted = runtime.block_on(async {
                tokio::select! {
                    _ = tokio::time::sleep(interval - elapsed) => false,
                    _ = shutdown.notified() => true,
                }
            });
            if interrupted {
                break;
            }
        }
    }

    info!("Suggestion responder stopped");
}
