use std::io::{self, Write};
use std::sync::Mutex;

use serde::Serialize;

use crate::markdown::{RunStyle, StyledRun};

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_YELLOW: &str = "\x1b[33m";

/// A pane that can be atomically repopulated with styled suggestion runs.
/// `replace` swaps the whole contents in one call so a reader never sees a
/// half-painted frame.
pub trait DisplaySurface: Send + Sync {
    fn replace(&self, runs: Vec<StyledRun>);
}

/// A pane showing the speaker-tagged transcript. Implementations are
/// expected to keep the end of the transcript visible after `replace`.
pub trait TranscriptView: Send + Sync {
    fn replace(&self, segments: Vec<TranscriptSegment>);
}

/// Styling bucket for one transcript segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerStyle {
    Local,
    Remote,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub style: SpeakerStyle,
}

/// Split a transcript snapshot into display segments, one per utterance.
/// Segments starting with the local speaker token get local styling, the
/// remote token remote styling, anything else is unstyled.
pub fn transcript_segments(
    snapshot: &str,
    local_label: &str,
    remote_label: &str,
) -> Vec<TranscriptSegment> {
    let local_token = format!("{}:", local_label);
    let remote_token = format!("{}:", remote_label);

    snapshot
        .split("\n\n")
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            let style = if segment.starts_with(&local_token) {
                SpeakerStyle::Local
            } else if segment.starts_with(&remote_token) {
                SpeakerStyle::Remote
            } else {
                SpeakerStyle::Plain
            };
            TranscriptSegment {
                text: segment.to_string(),
                style,
            }
        })
        .collect()
}

/// Suggestion pane backed by the terminal. Repaints only when the rendered
/// text actually changed, since the poll loop re-renders every tick.
pub struct ConsoleSurface {
    title: &'static str,
    last_painted: Mutex<String>,
}

impl ConsoleSurface {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            last_painted: Mutex::new(String::new()),
        }
    }
}

impl DisplaySurface for ConsoleSurface {
    fn replace(&self, runs: Vec<StyledRun>) {
        let body = paint_runs(&runs);
        let mut last = self.last_painted.lock().unwrap();
        if *last == body {
            return;
        }
        *last = body.clone();
        drop(last);

        flush_pane(self.title, &body);
    }
}

/// Transcript pane backed by the terminal. Printing appends, so the end of
/// the transcript is always the last thing on screen.
pub struct ConsoleTranscriptView {
    title: &'static str,
    last_painted: Mutex<String>,
}

impl ConsoleTranscriptView {
    pub fn new(title: &'static str) -> Self {
        Self {
            title,
            last_painted: Mutex::new(String::new()),
        }
    }
}

impl TranscriptView for ConsoleTranscriptView {
    fn replace(&self, segments: Vec<TranscriptSegment>) {
        let body = paint_segments(&segments);
        let mut last = self.last_painted.lock().unwrap();
        if *last == body {
            return;
        }
        *last = body.clone();
        drop(last);

        flush_pane(self.title, &body);
    }
}

fn flush_pane(title: &str, body: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "\n{}── {} ──{}\n{}", ANSI_BOLD, title, ANSI_RESET, body);
    let _ = out.flush();
}

fn paint_runs(runs: &[StyledRun]) -> String {
    let mut painted = String::new();
    for run in runs {
        match run.style {
            RunStyle::Plain => painted.push_str(&run.text),
            RunStyle::Header1 | RunStyle::Header2 | RunStyle::Header3 => {
                painted.push_str(&format!("{}{}{}\n", ANSI_BOLD, run.text, ANSI_RESET));
            }
            RunStyle::Bold => {
                painted.push_str(&format!("{}{}{}", ANSI_BOLD, run.text, ANSI_RESET));
            }
            RunStyle::Italic => {
                painted.push_str(&format!("{}{}{}", ANSI_ITALIC, run.text, ANSI_RESET));
            }
            RunStyle::InlineCode => {
                painted.push_str(&format!("{}{}{}", ANSI_CYAN, run.text, ANSI_RESET));
            }
            RunStyle::CodeBlock => {
                painted.push_str(&format!("{}{}{}\n", ANSI_DIM, run.text, ANSI_RESET));
            }
            RunStyle::BulletItem | RunStyle::NumberedItem => {
                painted.push_str(&format!("• {}\n", run.text));
            }
        }
    }
    painted
}

fn paint_segments(segments: &[TranscriptSegment]) -> String {
    let mut painted = String::new();
    for segment in segments {
        match segment.style {
            SpeakerStyle::Local => {
                painted.push_str(&format!("{}{}{}\n\n", ANSI_CYAN, segment.text, ANSI_RESET));
            }
            SpeakerStyle::Remote => {
                painted.push_str(&format!(
                    "{}{}{}\n\n",
                    ANSI_YELLOW, segment.text, ANSI_RESET
                ));
            }
            SpeakerStyle::Plain => {
                painted.push_str(&format!("{}\n\n", segment.text));
            }
        }
    }
    painted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_segments_styling() {
        let snapshot = "You: hi\n\nThem: hello there\n\n[noise]";
        let segments = transcript_segments(snapshot, "You", "Them");

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].style, SpeakerStyle::Local);
        assert_eq!(segments[0].text, "You: hi");
        assert_eq!(segments[1].style, SpeakerStyle::Remote);
        assert_eq!(segments[2].style, SpeakerStyle::Plain);
    }

    #[test]
    fn test_transcript_segments_skip_blank() {
        let segments = transcript_segments("\n\n  \n\nYou: hi", "You", "Them");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_list_items_get_bullet_glyph() {
        let painted = paint_runs(&[StyledRun::new("first", RunStyle::BulletItem)]);
        assert!(painted.contains("• first"));
    }
}
