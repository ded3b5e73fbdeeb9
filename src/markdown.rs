use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::display::DisplaySurface;

static BLOCK_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
static BULLET_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s").unwrap());
static NUMBERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*[^*]+\*\*|\*[^*]+\*").unwrap());

/// Style tag of a rendered run. Closed set; display surfaces map these to
/// whatever styling their backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStyle {
    Plain,
    Header1,
    Header2,
    Header3,
    Bold,
    Italic,
    InlineCode,
    CodeBlock,
    BulletItem,
    NumberedItem,
}

/// A unit of renderable text with its style tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledRun {
    pub text: String,
    pub style: RunStyle,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Convert the constrained markup dialect into styled runs.
///
/// Blocks are delimited by runs of two or more newlines and classified in
/// priority order: fenced code, header, list, paragraph. Every block is
/// followed by a blank-line separator run, matching the paragraph spacing of
/// the rendered output.
pub fn render(markup: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();

    for block in BLOCK_SPLIT.split(markup) {
        if !block.trim().is_empty() {
            if block.starts_with("```") {
                push_code_block(block, &mut runs);
            } else if block.starts_with('#') {
                push_header(block, &mut runs);
            } else if BULLET_MARKER.is_match(block) || NUMBERED_MARKER.is_match(block) {
                push_list(block, &mut runs);
            } else {
                push_paragraph(block, &mut runs);
            }
        }

        runs.push(StyledRun::new("\n\n", RunStyle::Plain));
    }

    runs
}

/// Re-render `markup` onto a display surface, replacing its whole contents
/// in one call so readers never observe a half-painted pane.
pub fn render_to(markup: &str, surface: &dyn DisplaySurface) {
    surface.replace(render(markup));
}

fn push_code_block(block: &str, runs: &mut Vec<StyledRun>) {
    let lines: Vec<&str> = block.split('\n').collect();
    // Anything shorter has no closing fence and renders as nothing.
    if lines.len() >= 2 {
        runs.push(StyledRun::new(
            lines[1..lines.len() - 1].join("\n"),
            RunStyle::CodeBlock,
        ));
    }
}

fn push_header(block: &str, runs: &mut Vec<StyledRun>) {
    let level = block.chars().take_while(|c| *c == '#').count();
    let style = match level {
        1 => RunStyle::Header1,
        2 => RunStyle::Header2,
        _ => RunStyle::Header3,
    };
    runs.push(StyledRun::new(block.trim_start_matches('#').trim(), style));
}

fn push_list(block: &str, runs: &mut Vec<StyledRun>) {
    for line in block.split('\n') {
        if BULLET_MARKER.is_match(line) {
            runs.push(StyledRun::new(line[2..].trim(), RunStyle::BulletItem));
        } else if let Some(marker) = NUMBERED_MARKER.find(line) {
            runs.push(StyledRun::new(
                line[marker.end()..].trim(),
                RunStyle::NumberedItem,
            ));
        }
    }
}

fn push_paragraph(block: &str, runs: &mut Vec<StyledRun>) {
    for span in split_marked(&INLINE_CODE, block) {
        match span {
            Span::Marked(code) => {
                runs.push(StyledRun::new(
                    &code[1..code.len() - 1],
                    RunStyle::InlineCode,
                ));
            }
            Span::Text(text) => push_emphasis(text, runs),
        }
    }
}

fn push_emphasis(text: &str, runs: &mut Vec<StyledRun>) {
    for span in split_marked(&EMPHASIS, text) {
        match span {
            // Bold before italic: its delimiter is a strict prefix of the
            // italic one, and the match carries both delimiters.
            Span::Marked(m) if m.starts_with("**") => {
                runs.push(StyledRun::new(&m[2..m.len() - 2], RunStyle::Bold));
            }
            Span::Marked(m) => {
                runs.push(StyledRun::new(&m[1..m.len() - 1], RunStyle::Italic));
            }
            Span::Text(t) => {
                if !t.is_empty() {
                    runs.push(StyledRun::new(t, RunStyle::Plain));
                }
            }
        }
    }
}

/// A piece of text split around regex matches, keeping the matches and
/// remembering which pieces were matched. Unmatched delimiters (for example
/// an unterminated `*`) stay in `Text` pieces and degrade to plain output.
enum Span<'a> {
    Text(&'a str),
    Marked(&'a str),
}

fn split_marked<'a>(re: &Regex, text: &'a str) -> Vec<Span<'a>> {
    let mut spans = Vec::new();
    let mut last = 0;

    for m in re.find_iter(text) {
        if m.start() > last {
            spans.push(Span::Text(&text[last..m.start()]));
        }
        spans.push(Span::Marked(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::Text(&text[last..]));
    }

    spans
}
