pub mod archive;
pub mod cli;
pub mod display;
pub mod input_source;
pub mod llm_client;
pub mod markdown;
pub mod poll;
pub mod responder;
pub mod response_store;
pub mod session;
pub mod settings;
pub mod startup;
pub mod transcript;

use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use crate::archive::ConversationArchiver;
use crate::cli::CliArgs;
use crate::display::{ConsoleSurface, ConsoleTranscriptView};
use crate::llm_client::{effective_api_key, SuggestionClient};
use crate::poll::{PollDriver, UiControls};
use crate::responder::ResponderManager;
use crate::response_store::ResponseStore;
use crate::session::SessionController;
use crate::settings::{load_or_create_app_settings, SETTINGS_STORE_PATH};
use crate::transcript::Transcript;

/// Why the main thread left its wait.
pub enum ShutdownReason {
    InputClosed,
    Signal,
}

fn init_logging() {
    // RUST_LOG wins; default to info-level console logging.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

pub fn run() -> Result<()> {
    let args = CliArgs::parse();
    init_logging();

    startup::check_ffmpeg()?;

    let mut settings = load_or_create_app_settings(Path::new(SETTINGS_STORE_PATH));
    if args.local {
        // Consumed by the (out-of-scope) transcription model loader.
        settings.use_local_model = true;
        info!("Local transcription model selected");
    }

    let transcript = Arc::new(Transcript::new(
        settings.local_speaker_label.clone(),
        settings.remote_speaker_label.clone(),
    ));

    let api_key = effective_api_key(&settings.api_key);
    if api_key.is_empty() {
        warn!("No API key configured; suggestion fetches will likely be rejected");
    }
    let client = SuggestionClient::new(settings.api_endpoint.clone(), &api_key)?;

    let responder = ResponderManager::new(client, settings.clamped_interval_secs());
    let store = Arc::new(Mutex::new(ResponseStore::new()));
    let controls = Arc::new(UiControls::new(settings.clamped_interval_secs()));

    let session = Arc::new(SessionController::new(
        Arc::clone(&transcript),
        Arc::clone(&store),
        responder.state(),
        ConversationArchiver::new(&settings.save_dir),
    ));

    let poll = PollDriver::new(
        Arc::clone(&transcript),
        responder.state(),
        Arc::clone(&store),
        Arc::clone(&controls),
        Arc::new(ConsoleSurface::new("Suggestions")),
        Arc::new(ConsoleTranscriptView::new("Transcript")),
    );

    responder.start(Arc::clone(&transcript));
    poll.start();

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let _input_feed = input_source::start_stdin_feed(
        Arc::clone(&transcript),
        Arc::clone(&controls),
        Arc::clone(&session),
        shutdown_tx.clone(),
    );
    spawn_signal_listener(shutdown_tx);

    info!(
        "READY - type to speak, '>' prefix for the other party; \
         /pause /interval N /new /save /quit"
    );

    match shutdown_rx.recv() {
        Ok(ShutdownReason::InputClosed) => info!("Input closed; shutting down"),
        Ok(ShutdownReason::Signal) => info!("Signal received; shutting down"),
        Err(_) => warn!("All shutdown sources disconnected"),
    }

    // Final best-effort archive before teardown.
    match session.save_current_conversation() {
        Ok(path) => info!("Conversation saved: {:?}", path),
        Err(e) => error!("Failed to save conversation on shutdown: {:#}", e),
    }

    poll.stop();
    responder.stop();
    Ok(())
}

#[cfg(unix)]
fn spawn_signal_listener(shutdown_tx: mpsc::Sender<ShutdownReason>) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    std::thread::spawn(move || {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                return;
            }
        };
        if let Some(signal) = signals.forever().next() {
            info!("Received signal {}", signal);
            let _ = shutdown_tx.send(ShutdownReason::Signal);
        }
    });
}

#[cfg(not(unix))]
fn spawn_signal_listener(_shutdown_tx: mpsc::Sender<ShutdownReason>) {}
