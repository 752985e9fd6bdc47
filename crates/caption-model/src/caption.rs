//! Caption groups and the timed events handed to the renderer.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::transcript::Word;

/// Consecutive words from one segment shown together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionGroup {
    /// Words in display order. Never empty.
    pub words: Vec<Word>,
}

impl CaptionGroup {
    /// Create a group. Returns `None` for an empty word list.
    pub fn new(words: Vec<Word>) -> Option<Self> {
        if words.is_empty() {
            None
        } else {
            Some(Self { words })
        }
    }

    /// Start of the first word.
    pub fn start(&self) -> f64 {
        self.words[0].start
    }

    /// End of the last word.
    pub fn end(&self) -> f64 {
        self.words[self.words.len() - 1].end
    }

    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word texts, in order.
    pub fn word_texts(&self) -> Vec<String> {
        self.words.iter().map(|w| w.text.clone()).collect()
    }
}

/// One timed, colored caption overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEvent {
    /// All words shown by this event.
    pub words: Vec<String>,

    /// Visible interval start (inclusive), seconds.
    pub start: f64,

    /// Visible interval end (exclusive), seconds.
    pub end: f64,

    /// Index into `words` of the emphasized word, when highlighting.
    pub highlight_index: Option<usize>,

    /// Whether the zoom-in transition plays when this event appears.
    pub has_transition: bool,

    /// Base text color from the palette.
    pub color: Color,

    /// Index of the caption group this event belongs to.
    pub group_index: usize,
}

impl CaptionEvent {
    /// Displayed text, words joined by single spaces.
    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Visible duration in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether the event is visible at time `t` (half-open interval).
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    /// The highlighted word, if any.
    pub fn highlighted_word(&self) -> Option<&str> {
        self.highlight_index
            .and_then(|i| self.words.get(i))
            .map(String::as_str)
    }
}
