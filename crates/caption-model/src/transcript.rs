//! Transcript types produced by speech recognition.
//!
//! A transcript is an ordered list of segments, each holding ordered words
//! with their own start/end timestamps. Segments are the unit of grouping:
//! captions never combine words from two different segments.

use serde::{Deserialize, Serialize};

/// A single transcribed word with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text, trimmed.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds. Always `>= start`.
    pub end: f64,
}

impl Word {
    /// Create a word, trimming its text and normalizing inverted timings
    /// (`end < start` becomes a zero-duration word at `start`).
    pub fn new(text: impl AsRef<str>, start: f64, end: f64) -> Self {
        let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
        let end = if end.is_finite() { end.max(start) } else { start };
        Self {
            text: text.as_ref().trim().to_string(),
            start,
            end,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the word carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An ordered run of words as produced by the transcript source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub words: Vec<Word>,
}

impl Segment {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Words with non-empty text, in order.
    pub fn visible_words(&self) -> impl Iterator<Item = &Word> {
        self.words.iter().filter(|w| !w.is_blank())
    }

    /// Start of the first word, if any.
    pub fn start(&self) -> Option<f64> {
        self.words.first().map(|w| w.start)
    }

    /// End of the last word, if any.
    pub fn end(&self) -> Option<f64> {
        self.words.last().map(|w| w.end)
    }
}

/// A complete transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Decoding language (ISO 639-1).
    pub language: String,
    /// Segments in chronological order.
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(language: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            language: language.into(),
            segments,
        }
    }

    /// Number of non-blank words across all segments.
    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.visible_words().count()).sum()
    }

    /// Whether the transcript contains no visible words.
    pub fn is_empty(&self) -> bool {
        self.word_count() == 0
    }

    /// End time of the last word in the transcript.
    pub fn end_secs(&self) -> f64 {
        self.segments
            .iter()
            .filter_map(Segment::end)
            .fold(0.0, f64::max)
    }
}

/// Whisper model size selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    /// Fastest, least accurate (~39 MB).
    Tiny,
    /// Good balance of speed and accuracy (~142 MB).
    #[default]
    Base,
    /// Better accuracy, slower (~466 MB).
    Small,
    /// High accuracy (~1.5 GB).
    Medium,
    /// Best accuracy, slowest (~2.9 GB).
    Large,
}

impl WhisperModel {
    /// Model name as accepted by the whisper CLI.
    pub fn name(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        }
    }

    /// ggml model filename for whisper.cpp.
    pub fn filename(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "ggml-tiny.bin",
            WhisperModel::Base => "ggml-base.bin",
            WhisperModel::Small => "ggml-small.bin",
            WhisperModel::Medium => "ggml-medium.bin",
            WhisperModel::Large => "ggml-large.bin",
        }
    }
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" => Ok(WhisperModel::Large),
            other => Err(format!("unknown whisper model '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_trims_text() {
        let w = Word::new("  hello ", 1.0, 1.5);
        assert_eq!(w.text, "hello");
        assert!((w.duration() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_word_normalizes_inverted_timing() {
        let w = Word::new("x", 2.0, 1.0);
        assert_eq!(w.start, 2.0);
        assert_eq!(w.end, 2.0);
        assert_eq!(w.duration(), 0.0);
    }

    #[test]
    fn test_word_rejects_non_finite_times() {
        let w = Word::new("x", f64::NAN, f64::INFINITY);
        assert_eq!(w.start, 0.0);
        assert_eq!(w.end, 0.0);
    }

    #[test]
    fn test_blank_words_are_not_visible() {
        let seg = Segment::new(vec![
            Word::new("a", 0.0, 0.1),
            Word::new("   ", 0.1, 0.2),
            Word::new("", 0.2, 0.3),
            Word::new("b", 0.3, 0.4),
        ]);
        let texts: Vec<&str> = seg.visible_words().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_transcript_counts_and_end() {
        let transcript = Transcript::new(
            "en",
            vec![
                Segment::new(vec![Word::new("one", 0.0, 0.4), Word::new(" ", 0.4, 0.5)]),
                Segment::new(vec![Word::new("two", 1.0, 1.6)]),
            ],
        );
        assert_eq!(transcript.word_count(), 2);
        assert!((transcript.end_secs() - 1.6).abs() < 1e-9);
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_whisper_model_parsing() {
        assert_eq!("BASE".parse::<WhisperModel>().unwrap(), WhisperModel::Base);
        assert_eq!(WhisperModel::Small.filename(), "ggml-small.bin");
        assert!("huge".parse::<WhisperModel>().is_err());
    }
}
