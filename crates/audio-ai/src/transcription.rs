//! Speech-to-text with word-level timestamps.
//!
//! Three [`TranscriptSource`] implementations are provided:
//! - [`WhisperCli`] runs the `whisper` command and parses its JSON output
//! - [`WhisperEngine`] runs whisper.cpp in-process (cargo feature `whisper`)
//! - [`TranscriptFile`] loads a previously saved whisper JSON file
//!
//! The whisper-backed sources decode without conditioning on previous text.

use std::path::{Path, PathBuf};
use std::process::Command;

use captioneer_caption_model::{Segment, Transcript, WhisperModel, Word};
use captioneer_common::error::{CaptioneerError, CaptioneerResult};
use serde::Deserialize;

/// Anything that can turn an audio file into a timed transcript.
pub trait TranscriptSource {
    /// Transcribe `audio` into segments of timed words.
    fn transcribe(&self, audio: &Path) -> CaptioneerResult<Transcript>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Failure to interpret whisper JSON output.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("invalid transcript JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transcript has no segments")]
    NoSegments,
}

impl From<TranscriptError> for CaptioneerError {
    fn from(e: TranscriptError) -> Self {
        CaptioneerError::transcription(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    language: Option<String>,
    segments: Option<Vec<WhisperJsonSegment>>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Option<Vec<WhisperJsonWord>>,
}

#[derive(Debug, Deserialize)]
struct WhisperJsonWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse whisper's `--output_format json` document.
///
/// Segments without word timings have their text split on whitespace and
/// spread evenly over the segment.
pub fn parse_whisper_json(json: &str) -> Result<Transcript, TranscriptError> {
    let doc: WhisperJson = serde_json::from_str(json)?;
    let raw_segments = doc.segments.ok_or(TranscriptError::NoSegments)?;

    let segments = raw_segments
        .into_iter()
        .map(|seg| match seg.words {
            Some(words) => Segment::new(
                words
                    .into_iter()
                    .map(|w| Word::new(w.word, w.start, w.end))
                    .collect(),
            ),
            None => {
                tracing::debug!(
                    start = seg.start,
                    end = seg.end,
                    "Segment without word timestamps, spreading words evenly"
                );
                spread_words(&seg.text, seg.start, seg.end)
            }
        })
        .collect();

    Ok(Transcript::new(
        doc.language.unwrap_or_else(|| "en".to_string()),
        segments,
    ))
}

fn spread_words(text: &str, start: f64, end: f64) -> Segment {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Segment::default();
    }
    let step = (end - start).max(0.0) / tokens.len() as f64;
    Segment::new(
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let s = start + step * i as f64;
                Word::new(t, s, s + step)
            })
            .collect(),
    )
}

/// Loads a saved whisper JSON transcript. The audio path is ignored.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> CaptioneerResult<Transcript> {
        if !self.path.exists() {
            return Err(CaptioneerError::file_not_found(&self.path));
        }
        let json = std::fs::read_to_string(&self.path)?;
        let transcript = parse_whisper_json(&json)?;
        tracing::info!(
            path = %self.path.display(),
            words = transcript.word_count(),
            "Loaded transcript file"
        );
        Ok(transcript)
    }
}

impl TranscriptSource for TranscriptFile {
    fn transcribe(&self, _audio: &Path) -> CaptioneerResult<Transcript> {
        self.load()
    }

    fn name(&self) -> &'static str {
        "transcript-file"
    }
}

/// Options shared by the whisper-backed sources.
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub model: WhisperModel,

    /// Decoding language (ISO 639-1).
    pub language: String,

    /// CPU threads for in-process inference (0 = library default).
    pub threads: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: WhisperModel::Base,
            language: "en".to_string(),
            threads: 0,
        }
    }
}

/// Runs the `whisper` command-line tool.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    program: String,
    config: TranscriptionConfig,
}

impl WhisperCli {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            program: "whisper".to_string(),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TranscriptionConfig::default())
    }

    /// Use a different executable (e.g. a wrapper script).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Command-line arguments for transcribing `audio` into `output_dir`.
    pub fn args(&self, audio: &Path, output_dir: &Path) -> Vec<String> {
        vec![
            audio.display().to_string(),
            "--model".to_string(),
            self.config.model.name().to_string(),
            "--language".to_string(),
            self.config.language.clone(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--condition_on_previous_text".to_string(),
            "False".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.display().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ]
    }
}

impl TranscriptSource for WhisperCli {
    fn transcribe(&self, audio: &Path) -> CaptioneerResult<Transcript> {
        if !audio.exists() {
            return Err(CaptioneerError::file_not_found(audio));
        }

        let out_dir = tempfile::Builder::new()
            .prefix("captioneer-whisper-")
            .tempdir()?;

        tracing::info!(
            audio = %audio.display(),
            model = self.config.model.name(),
            language = %self.config.language,
            "Transcribing with whisper"
        );

        let output = Command::new(&self.program)
            .args(self.args(audio, out_dir.path()))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CaptioneerError::transcription(format!(
                        "'{}' not found on PATH (install openai-whisper or pass --transcript)",
                        self.program
                    ))
                } else {
                    CaptioneerError::transcription(format!("failed to run {}: {e}", self.program))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptioneerError::transcription(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = out_dir.path().join(format!("{stem}.json"));
        let json = std::fs::read_to_string(&json_path).map_err(|e| {
            CaptioneerError::transcription(format!(
                "whisper output {} unreadable: {e}",
                json_path.display()
            ))
        })?;

        let transcript = parse_whisper_json(&json)?;
        tracing::info!(
            segments = transcript.segments.len(),
            words = transcript.word_count(),
            "Transcription complete"
        );
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "whisper-cli"
    }
}

/// A whisper.cpp token with its timing, as seen by word merging.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedToken {
    pub text: String,
    /// Start in seconds.
    pub start: f64,
    /// End in seconds.
    pub end: f64,
}

/// Merge sub-word tokens into words. A token starting with whitespace
/// begins a new word; control tokens (`[_...]`, `<|...|>`) are skipped.
pub fn merge_tokens(tokens: &[TimedToken]) -> Vec<Word> {
    let mut words: Vec<(String, f64, f64)> = Vec::new();
    for token in tokens {
        if token.text.starts_with("[_") || token.text.starts_with("<|") {
            continue;
        }
        let starts_word = token.text.starts_with(char::is_whitespace);
        match words.last_mut() {
            Some(current) if !starts_word => {
                current.0.push_str(&token.text);
                current.2 = token.end;
                continue;
            }
            _ => {}
        }
        words.push((token.text.clone(), token.start, token.end));
    }
    words
        .into_iter()
        .map(|(text, start, end)| Word::new(text, start, end))
        .filter(|w| !w.is_blank())
        .collect()
}

#[cfg(feature = "whisper")]
mod engine_impl {
    use super::*;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// In-process whisper.cpp transcription.
    pub struct WhisperEngine {
        context: WhisperContext,
        config: TranscriptionConfig,
    }

    impl WhisperEngine {
        /// Load the ggml model for `config.model` from `model_dir`.
        pub fn new(model_dir: &Path, config: TranscriptionConfig) -> CaptioneerResult<Self> {
            let model_path = model_dir.join(config.model.filename());
            Self::from_model_file(&model_path, config)
        }

        pub fn from_model_file(
            model_path: &Path,
            config: TranscriptionConfig,
        ) -> CaptioneerResult<Self> {
            if !model_path.exists() {
                return Err(CaptioneerError::file_not_found(model_path));
            }
            let path = model_path.to_str().ok_or_else(|| {
                CaptioneerError::transcription("model path is not valid UTF-8")
            })?;
            let context =
                WhisperContext::new_with_params(path, WhisperContextParameters::default())
                    .map_err(|e| {
                        CaptioneerError::transcription(format!("failed to load model: {e}"))
                    })?;
            tracing::info!(model = %model_path.display(), "Loaded whisper model");
            Ok(Self { context, config })
        }

        /// Transcribe 16 kHz mono samples.
        pub fn transcribe_samples(&self, samples: &[f32]) -> CaptioneerResult<Transcript> {
            let err = |e: whisper_rs::WhisperError| CaptioneerError::transcription(e.to_string());

            let mut state = self.context.create_state().map_err(err)?;
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(self.config.language.as_str()));
            params.set_token_timestamps(true);
            params.set_no_context(true);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_print_special(false);
            if self.config.threads > 0 {
                params.set_n_threads(self.config.threads as i32);
            }

            state.full(params, samples).map_err(err)?;

            let n_segments = state.full_n_segments().map_err(err)?;
            let mut segments = Vec::with_capacity(n_segments.max(0) as usize);
            for seg in 0..n_segments {
                let n_tokens = state.full_n_tokens(seg).map_err(err)?;
                let mut tokens = Vec::with_capacity(n_tokens.max(0) as usize);
                for tok in 0..n_tokens {
                    let text = state.full_get_token_text(seg, tok).map_err(err)?;
                    let data = state.full_get_token_data(seg, tok).map_err(err)?;
                    tokens.push(TimedToken {
                        text,
                        start: data.t0 as f64 / 100.0,
                        end: data.t1 as f64 / 100.0,
                    });
                }
                segments.push(Segment::new(merge_tokens(&tokens)));
            }

            Ok(Transcript::new(self.config.language.clone(), segments))
        }
    }

    impl TranscriptSource for WhisperEngine {
        fn transcribe(&self, audio: &Path) -> CaptioneerResult<Transcript> {
            if !audio.exists() {
                return Err(CaptioneerError::file_not_found(audio));
            }
            let samples = crate::audio::load_audio_samples(audio)?;
            tracing::info!(
                samples = samples.len(),
                model = self.config.model.name(),
                "Transcribing with whisper.cpp"
            );
            self.transcribe_samples(&samples)
        }

        fn name(&self) -> &'static str {
            "whisper-engine"
        }
    }
}

#[cfg(feature = "whisper")]
pub use engine_impl::WhisperEngine;

/// Placeholder when built without the `whisper` feature.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperEngine;

#[cfg(not(feature = "whisper"))]
impl WhisperEngine {
    pub fn new(_model_dir: &Path, _config: TranscriptionConfig) -> CaptioneerResult<Self> {
        Err(CaptioneerError::unsupported(
            "in-process whisper requires building with --features whisper",
        ))
    }
}

#[cfg(not(feature = "whisper"))]
impl TranscriptSource for WhisperEngine {
    fn transcribe(&self, _audio: &Path) -> CaptioneerResult<Transcript> {
        Err(CaptioneerError::unsupported(
            "in-process whisper requires building with --features whisper",
        ))
    }

    fn name(&self) -> &'static str {
        "whisper-engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "text": " Hi there friend. Bye.",
        "language": "en",
        "segments": [
            {"id": 0, "start": 0.0, "end": 1.5, "text": " Hi there friend.",
             "words": [
                {"word": " Hi", "start": 0.0, "end": 0.3, "probability": 0.9},
                {"word": " there", "start": 0.3, "end": 0.8, "probability": 0.9},
                {"word": " friend.", "start": 0.8, "end": 1.5, "probability": 0.8}
             ]},
            {"id": 1, "start": 2.0, "end": 2.4, "text": " Bye.",
             "words": [{"word": " Bye.", "start": 2.0, "end": 2.4}]}
        ]
    }"#;

    #[test]
    fn test_parse_whisper_json_words() {
        let transcript = parse_whisper_json(SAMPLE).unwrap();
        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.segments.len(), 2);
        let first = &transcript.segments[0].words;
        assert_eq!(first[0].text, "Hi");
        assert_eq!(first[2].text, "friend.");
        assert_eq!((first[2].start, first[2].end), (0.8, 1.5));
        assert_eq!(transcript.word_count(), 4);
    }

    #[test]
    fn test_parse_segment_without_words_spreads_evenly() {
        let json = r#"{"segments": [{"start": 1.0, "end": 2.0, "text": " a b"}]}"#;
        let transcript = parse_whisper_json(json).unwrap();
        let words = &transcript.segments[0].words;
        assert_eq!(words.len(), 2);
        assert_eq!((words[0].start, words[0].end), (1.0, 1.5));
        assert_eq!((words[1].start, words[1].end), (1.5, 2.0));
        assert_eq!(transcript.language, "en");
    }

    #[test]
    fn test_parse_rejects_missing_segments() {
        assert!(matches!(
            parse_whisper_json(r#"{"text": ""}"#),
            Err(TranscriptError::NoSegments)
        ));
        assert!(matches!(
            parse_whisper_json("not json"),
            Err(TranscriptError::Json(_))
        ));
    }

    #[test]
    fn test_inverted_word_timing_normalized() {
        let json = r#"{"segments": [{"words": [{"word": "x", "start": 2.0, "end": 1.0}]}]}"#;
        let transcript = parse_whisper_json(json).unwrap();
        let w = &transcript.segments[0].words[0];
        assert_eq!((w.start, w.end), (2.0, 2.0));
    }

    #[test]
    fn test_transcript_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let source = TranscriptFile::new(&path);
        let transcript = source.transcribe(Path::new("unused.wav")).unwrap();
        assert_eq!(transcript.word_count(), 4);
    }

    #[test]
    fn test_transcript_file_missing() {
        let err = TranscriptFile::new("/nonexistent/t.json").load().unwrap_err();
        assert!(matches!(err, CaptioneerError::FileNotFound { .. }));
    }

    #[test]
    fn test_whisper_cli_args() {
        let cli = WhisperCli::new(TranscriptionConfig {
            model: WhisperModel::Small,
            language: "en".to_string(),
            threads: 0,
        });
        let args = cli.args(Path::new("a.wav"), Path::new("/tmp/out")).join(" ");
        assert!(args.starts_with("a.wav --model small --language en"));
        assert!(args.contains("--word_timestamps True"));
        assert!(args.contains("--condition_on_previous_text False"));
        assert!(args.contains("--output_format json --output_dir /tmp/out"));
    }

    #[test]
    fn test_whisper_cli_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        std::fs::write(&audio, b"RIFF").unwrap();
        let cli = WhisperCli::with_defaults().with_program("captioneer-no-such-whisper");
        let err = cli.transcribe(&audio).unwrap_err();
        assert!(matches!(err, CaptioneerError::Transcription { .. }));
    }

    #[test]
    fn test_merge_tokens_into_words() {
        let tok = |t: &str, s: f64, e: f64| TimedToken {
            text: t.to_string(),
            start: s,
            end: e,
        };
        let words = merge_tokens(&[
            tok("[_BEG_]", 0.0, 0.0),
            tok(" Hel", 0.0, 0.2),
            tok("lo", 0.2, 0.4),
            tok(" world", 0.5, 0.9),
            tok("<|endoftext|>", 0.9, 0.9),
        ]);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");
        assert_eq!((words[0].start, words[0].end), (0.0, 0.4));
        assert_eq!(words[1].text, "world");
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_engine_stub_reports_unsupported() {
        let err = WhisperEngine::new(Path::new("."), TranscriptionConfig::default()).unwrap_err();
        assert!(matches!(err, CaptioneerError::Unsupported { .. }));
    }
}
