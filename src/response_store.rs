use once_cell::sync::Lazy;

/// Visual separator inserted between accumulated suggestions.
static SEPARATOR: Lazy<String> = Lazy::new(|| "─".repeat(50));

/// Ordered, deduplicating accumulator for suggestion texts.
///
/// Adjacent entries are never equal and blank texts are never stored. The
/// poll loop is the only writer; other threads reach the store through a
/// shared mutex.
#[derive(Debug, Default)]
pub struct ResponseStore {
    responses: Vec<String>,
    last_response: String,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a suggestion unless it is blank after trimming or repeats the
    /// last added entry verbatim.
    pub fn add(&mut self, text: &str) {
        if text.trim().is_empty() || text == self.last_response {
            return;
        }
        self.responses.push(text.to_string());
        self.last_response = text.to_string();
    }

    /// All entries in insertion order, joined by a horizontal rule.
    pub fn formatted(&self) -> String {
        if self.responses.is_empty() {
            return String::new();
        }
        self.responses
            .join(&format!("\n\n{}\n\n", SEPARATOR.as_str()))
    }

    pub fn clear(&mut self) {
        self.responses.clear();
        self.last_response = String::new();
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
