//! Captioneer Audio Intelligence
//!
//! Speech side of the pipeline:
//! - **Audio Extraction:** 16 kHz mono WAV pulled from the input video via ffmpeg
//! - **Transcription:** Whisper word-level timestamps (CLI, local engine, or saved JSON)
//! - **Subtitle Generation:** SRT/VTT sidecars from caption events

pub mod audio;
pub mod subtitles;
pub mod transcription;

pub use audio::*;
pub use subtitles::*;
pub use transcription::*;
