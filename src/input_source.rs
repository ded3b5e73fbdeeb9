use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

use crate::poll::UiControls;
use crate::session::SessionController;
use crate::transcript::{Speaker, Transcript};
use crate::ShutdownReason;

/// Commands recognized on stdin alongside plain utterances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputCommand {
    TogglePause,
    SetInterval(u64),
    NewConversation,
    SaveConversation,
    Quit,
}

/// Spawn the stand-in external producer: a reader thread that turns stdin
/// lines into speaker-tagged utterances and control commands. A real
/// deployment replaces this with the audio transcription pipeline writing
/// into the same `Transcript`.
pub fn start_stdin_feed(
    transcript: Arc<Transcript>,
    controls: Arc<UiControls>,
    session: Arc<SessionController>,
    shutdown_tx: Sender<ShutdownReason>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('/') {
                match parse_command(trimmed) {
                    Some(InputCommand::Quit) => break,
                    Some(command) => apply_command(command, &controls, &session),
                    None => warn!("Unknown command: {}", trimmed),
                }
                continue;
            }

            let (speaker, text) = parse_utterance(trimmed);
            transcript.push(speaker, text);
        }

        info!("Input stream closed");
        let _ = shutdown_tx.send(ShutdownReason::InputClosed);
    })
}

/// Lines prefixed with `>` belong to the other party; everything else is
/// the local speaker.
fn parse_utterance(line: &str) -> (Speaker, &str) {
    match line.strip_prefix('>') {
        Some(rest) => (Speaker::Remote, rest.trim_start()),
        None => (Speaker::Local, line),
    }
}

fn parse_command(line: &str) -> Option<InputCommand> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "/pause" => Some(InputCommand::TogglePause),
        "/interval" => parts
            .next()
            .and_then(|value| value.parse().ok())
            .map(InputCommand::SetInterval),
        "/new" => Some(InputCommand::NewConversation),
        "/save" => Some(InputCommand::SaveConversation),
        "/quit" => Some(InputCommand::Quit),
        _ => None,
    }
}

fn apply_command(command: InputCommand, controls: &UiControls, session: &SessionController) {
    match command {
        InputCommand::TogglePause => {
            let paused = controls.toggle_paused();
            info!(
                "Suggestions {}",
                if paused { "paused" } else { "resumed" }
            );
        }
        InputCommand::SetInterval(secs) => {
            controls.set_interval_secs(secs);
            info!("Update interval: {} seconds", controls.interval_secs());
        }
        InputCommand::NewConversation => match session.new_conversation() {
            Ok(path) => info!("Conversation archived: {:?}", path),
            Err(e) => error!("Failed to start new conversation: {:#}", e),
        },
        InputCommand::SaveConversation => match session.save_current_conversation() {
            Ok(path) => info!("Conversation saved: {:?}", path),
            Err(e) => error!("Failed to save conversation: {:#}", e),
        },
        InputCommand::Quit => {}
    }
}
