//! Audio extraction for transcription.
//!
//! Whisper wants 16 kHz mono PCM. The extracted WAV lives in a private
//! temporary directory that is removed when the [`ExtractedAudio`] handle
//! is dropped, on success and error paths alike.

use std::path::{Path, PathBuf};
use std::process::Command;

use captioneer_common::error::{CaptioneerError, CaptioneerResult};
use tempfile::TempDir;

/// Sample rate expected by Whisper.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// A temporary WAV file owned by its directory guard.
#[derive(Debug)]
pub struct ExtractedAudio {
    path: PathBuf,
    _dir: TempDir,
}

impl ExtractedAudio {
    /// Path to the extracted WAV.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Extract the audio track of `input` into a fresh temporary directory.
pub fn extract_audio(input: &Path) -> CaptioneerResult<ExtractedAudio> {
    let dir = tempfile::Builder::new()
        .prefix("captioneer-audio-")
        .tempdir()?;
    let path = dir.path().join("audio.wav");
    extract_audio_to(input, &path, "ffmpeg")?;
    Ok(ExtractedAudio { path, _dir: dir })
}

/// Extract the audio track of `input` to `output` as 16 kHz mono WAV.
pub fn extract_audio_to(input: &Path, output: &Path, ffmpeg: &str) -> CaptioneerResult<()> {
    if !input.exists() {
        return Err(CaptioneerError::file_not_found(input));
    }

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "Extracting audio for transcription"
    );

    let args = extraction_args(input, output);
    let result = Command::new(ffmpeg).args(&args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CaptioneerError::audio(format!("'{ffmpeg}' not found on PATH"))
        } else {
            CaptioneerError::audio(format!("failed to run {ffmpeg}: {e}"))
        }
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let tail = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(CaptioneerError::audio(format!(
            "audio extraction failed ({}): {tail}",
            result.status
        )));
    }

    if !output.exists() {
        return Err(CaptioneerError::audio(format!(
            "ffmpeg produced no audio file at {}",
            output.display()
        )));
    }

    Ok(())
}

/// ffmpeg arguments for a 16 kHz mono 16-bit PCM extraction.
pub fn extraction_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-vn".to_string(),
        "-ar".to_string(),
        WHISPER_SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.display().to_string(),
    ]
}

/// Load a 16 kHz mono WAV as f32 samples in `[-1.0, 1.0]`.
#[cfg(feature = "whisper")]
pub fn load_audio_samples(wav_path: &Path) -> CaptioneerResult<Vec<f32>> {
    let reader = hound::WavReader::open(wav_path)
        .map_err(|e| CaptioneerError::audio(format!("failed to open WAV file: {e}")))?;
    let spec = reader.spec();

    if spec.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(CaptioneerError::audio(format!(
            "expected {WHISPER_SAMPLE_RATE} Hz audio, got {} Hz",
            spec.sample_rate
        )));
    }
    if spec.channels != 1 {
        return Err(CaptioneerError::audio(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<Result<Vec<_>, _>>(),
        (hound::SampleFormat::Int, 32) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<Result<Vec<_>, _>>(),
        (hound::SampleFormat::Float, 32) => {
            reader.into_samples::<f32>().collect::<Result<Vec<_>, _>>()
        }
        (format, bits) => {
            return Err(CaptioneerError::audio(format!(
                "unsupported WAV sample format {format:?}/{bits}-bit"
            )))
        }
    };

    samples.map_err(|e| CaptioneerError::audio(format!("failed to read WAV samples: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_args_request_whisper_format() {
        let args = extraction_args(Path::new("in.mp4"), Path::new("out.wav"));
        let joined = args.join(" ");
        assert!(joined.contains("-i in.mp4"));
        assert!(joined.contains("-ar 16000"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.contains("-c:a pcm_s16le"));
        assert_eq!(args.last().map(String::as_str), Some("out.wav"));
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_audio_to(
            &dir.path().join("missing.mp4"),
            &dir.path().join("out.wav"),
            "ffmpeg",
        )
        .unwrap_err();
        assert!(matches!(err, CaptioneerError::FileNotFound { .. }));
    }

    #[test]
    fn test_missing_ffmpeg_binary_is_audio_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"not a video").unwrap();
        let err = extract_audio_to(
            &input,
            &dir.path().join("out.wav"),
            "captioneer-no-such-ffmpeg",
        )
        .unwrap_err();
        assert!(matches!(err, CaptioneerError::Audio { .. }));
    }

    #[cfg(feature = "whisper")]
    #[test]
    fn test_load_audio_samples_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: WHISPER_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for v in [0i16, 16384, -32768] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let samples = load_audio_samples(&path).unwrap();
        assert_eq!(samples, vec![0.0, 0.5, -1.0]);
    }
}
