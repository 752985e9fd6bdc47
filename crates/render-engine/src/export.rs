//! Video probing and ffmpeg export.
//!
//! The caption overlay is streamed to ffmpeg as raw RGBA frames on stdin.
//! ffmpeg overlays it on the source video, mixes the optional intro sound
//! into the audio track and encodes with the configured codecs.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;

use captioneer_common::error::{CaptioneerError, CaptioneerResult};
use serde_json::Value;

use crate::compositor::OverlayCompositor;

/// Stream properties of the input video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second as a float, used for frame timestamps.
    pub fps: f64,
    /// Frame rate as reported by ffprobe (e.g. `30000/1001`).
    pub frame_rate: String,
    pub duration_secs: f64,
    pub has_audio: bool,
}

impl VideoInfo {
    /// Number of overlay frames needed to cover the whole video.
    pub fn total_frames(&self) -> u64 {
        (self.duration_secs * self.fps).ceil().max(0.0) as u64
    }
}

/// A caption render ready to run.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Source video.
    pub input: PathBuf,

    /// Output file path.
    pub output: PathBuf,

    /// Sound mixed in at the start of the video.
    pub intro_sound: Option<PathBuf>,

    pub video_codec: String,
    pub audio_codec: String,

    /// Probed properties of `input`.
    pub video: VideoInfo,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    fn at_stage(stage: ExportStage, total_frames: u64) -> Self {
        let done = stage == ExportStage::Complete;
        Self {
            progress: if done { 1.0 } else { 0.0 },
            frames_rendered: if done { total_frames } else { 0 },
            total_frames,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Something that can encode a captioned video.
pub trait RenderBackend {
    /// Execute the render job, pulling overlay frames from `compositor`.
    fn render(
        &mut self,
        job: &RenderJob,
        compositor: &mut OverlayCompositor,
        progress: Option<ProgressCallback>,
    ) -> CaptioneerResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Render captions onto the job's video.
///
/// This is the main entry point for rendering.
pub fn render_captions(
    mut job: RenderJob,
    compositor: &mut OverlayCompositor,
    progress: Option<ProgressCallback>,
) -> CaptioneerResult<PathBuf> {
    tracing::info!(
        input = %job.input.display(),
        output = %job.output.display(),
        width = job.video.width,
        height = job.video.height,
        fps = job.video.fps,
        "Starting caption render"
    );

    if !job.input.exists() {
        return Err(CaptioneerError::file_not_found(&job.input));
    }
    if (compositor.width(), compositor.height()) != (job.video.width, job.video.height) {
        return Err(CaptioneerError::render(format!(
            "overlay size {}x{} does not match video size {}x{}",
            compositor.width(),
            compositor.height(),
            job.video.width,
            job.video.height
        )));
    }

    if let Some(intro) = &job.intro_sound {
        if !intro.exists() {
            tracing::warn!(path = %intro.display(), "Intro sound not found, skipping");
            job.intro_sound = None;
        }
    }

    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut backend: Box<dyn RenderBackend> = Box::new(FfmpegBackend::new());
    if !backend.is_available() {
        return Err(CaptioneerError::unsupported(
            "No supported render backend found (expected ffmpeg in PATH)",
        ));
    }

    tracing::info!(backend = backend.name(), "Using render backend");
    if let Err(err) = backend.render(&job, compositor, progress.clone()) {
        if let Some(cb) = &progress {
            cb(ExportProgress::at_stage(
                ExportStage::Failed,
                job.video.total_frames(),
            ));
        }
        return Err(err);
    }

    Ok(job.output)
}

/// ffmpeg-based backend.
#[derive(Debug)]
pub struct FfmpegBackend {
    program: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }

    /// Use a different ffmpeg executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run_ffmpeg(
        &self,
        job: &RenderJob,
        compositor: &mut OverlayCompositor,
        progress: Option<ProgressCallback>,
    ) -> CaptioneerResult<()> {
        let args = build_ffmpeg_args(job);
        let total_frames = job.video.total_frames();
        let expected_duration_secs = job.video.duration_secs;

        tracing::debug!(args = ?args, "Running ffmpeg");
        let start = std::time::Instant::now();
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CaptioneerError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            total_frames,
            "ffmpeg process started"
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let guard = ChildGuard(Some(child));

        let mut stdin =
            stdin.ok_or_else(|| CaptioneerError::render("Failed to capture ffmpeg stdin"))?;
        let stdout =
            stdout.ok_or_else(|| CaptioneerError::render("Failed to capture ffmpeg stdout"))?;
        let stderr =
            stderr.ok_or_else(|| CaptioneerError::render("Failed to capture ffmpeg stderr"))?;

        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let progress_cb = progress.clone();
        let progress_task = std::thread::spawn(move || {
            watch_progress(
                BufReader::new(stdout),
                progress_cb,
                total_frames,
                expected_duration_secs,
                start,
            )
        });

        let fps = job.video.fps;
        let mut write_error = None;
        for frame_index in 0..total_frames {
            let t = frame_index as f64 / fps;
            let frame = compositor.render_frame(t)?;
            if let Err(err) = stdin.write_all(frame.as_raw()) {
                write_error = Some(err);
                break;
            }
        }
        drop(stdin);

        let status = guard
            .wait()
            .map_err(|e| CaptioneerError::render(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());
        if progress_task.join().is_err() {
            tracing::warn!("ffmpeg progress reader panicked");
        }

        if !status.success() {
            return Err(CaptioneerError::render(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        if let Some(err) = write_error {
            return Err(CaptioneerError::render(format!(
                "Failed to stream overlay frames to ffmpeg: {err}"
            )));
        }

        if let Some(cb) = &progress {
            cb(ExportProgress::at_stage(ExportStage::Complete, total_frames));
        }

        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(
        &mut self,
        job: &RenderJob,
        compositor: &mut OverlayCompositor,
        progress: Option<ProgressCallback>,
    ) -> CaptioneerResult<()> {
        let started = std::time::Instant::now();
        if let Some(cb) = &progress {
            cb(ExportProgress::at_stage(
                ExportStage::Preparing,
                job.video.total_frames(),
            ));
        }

        self.run_ffmpeg(job, compositor, progress)?;
        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %job.output.display(),
            "Render finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.program)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Kills and reaps the child if the render stops before `wait`.
struct ChildGuard(Option<Child>);

impl ChildGuard {
    fn wait(mut self) -> std::io::Result<ExitStatus> {
        match self.0.take() {
            Some(mut child) => child.wait(),
            None => Err(std::io::Error::new(
                ErrorKind::Other,
                "child process already reaped",
            )),
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            tracing::debug!(pid = child.id(), "Stopping ffmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn watch_progress(
    mut reader: impl BufRead,
    progress: Option<ProgressCallback>,
    total_frames: u64,
    expected_duration_secs: f64,
    start: std::time::Instant,
) {
    let mut line = String::new();
    let mut latest_progress = ProgressState::default();
    let mut last_progress_secs = 0.0f64;
    let mut last_progress_wall = std::time::Instant::now();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed reading ffmpeg progress");
                break;
            }
        }

        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        latest_progress.update(key, value);
        if key != "progress" {
            continue;
        }

        if latest_progress.out_time_secs > last_progress_secs + 0.001 {
            last_progress_secs = latest_progress.out_time_secs;
            last_progress_wall = std::time::Instant::now();
        }
        if let Some(cb) = &progress {
            cb(progress_report(
                &latest_progress,
                total_frames,
                expected_duration_secs,
                start.elapsed().as_secs_f64(),
            ));
        }
        if last_progress_wall.elapsed().as_secs() >= 10 {
            tracing::warn!(
                out_time_secs = latest_progress.out_time_secs,
                elapsed_secs = start.elapsed().as_secs_f64(),
                "No ffmpeg progress advancement for 10s"
            );
            last_progress_wall = std::time::Instant::now();
        }
    }
}

/// Full ffmpeg argument list for a render job.
///
/// Inputs: `0` source video, `1` raw RGBA overlay on stdin, `2` the
/// optional intro sound.
pub fn build_ffmpeg_args(job: &RenderJob) -> Vec<String> {
    let video = &job.video;
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(job.input.display().to_string());

    let size = format!("{}x{}", video.width, video.height);
    args.extend(
        [
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            size.as_str(),
            "-r",
            video.frame_rate.as_str(),
            "-i",
            "pipe:0",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    if let Some(intro) = &job.intro_sound {
        args.push("-i".to_string());
        args.push(intro.display().to_string());
    }

    let mut filter =
        "[0:v][1:v]overlay=0:0:eof_action=pass,format=yuv420p[vout]".to_string();
    let audio_map = match (video.has_audio, job.intro_sound.is_some()) {
        (true, true) => {
            filter.push_str(";[0:a][2:a]amix=inputs=2:duration=first:dropout_transition=0[aout]");
            Some("[aout]")
        }
        (false, true) => {
            filter.push_str(";[2:a]apad[aout]");
            Some("[aout]")
        }
        (true, false) => Some("0:a?"),
        (false, false) => None,
    };

    args.push("-filter_complex".to_string());
    args.push(filter);
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    if let Some(map) = audio_map {
        args.push("-map".to_string());
        args.push(map.to_string());
    }

    args.extend(codec_args(job, audio_map.is_some()));
    if !video.has_audio && job.intro_sound.is_some() {
        args.push("-shortest".to_string());
    }
    args.push(job.output.display().to_string());
    args
}

fn codec_args(job: &RenderJob, has_audio: bool) -> Vec<String> {
    let mut args = vec!["-c:v".to_string(), job.video_codec.clone()];
    if has_audio {
        args.push("-c:a".to_string());
        args.push(job.audio_codec.clone());
    }

    let faststart = job
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "mov" | "m4v"))
        .unwrap_or(false);
    if faststart {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }
    args
}

/// Check whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe `path` with ffprobe.
pub fn probe_video(path: &Path) -> CaptioneerResult<VideoInfo> {
    if !path.exists() {
        return Err(CaptioneerError::file_not_found(path));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| CaptioneerError::render(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(CaptioneerError::render(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let info = parse_probe_json(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        duration_secs = info.duration_secs,
        has_audio = info.has_audio,
        "Probed input video"
    );
    Ok(info)
}

/// Parse ffprobe `-print_format json -show_streams -show_format` output.
pub fn parse_probe_json(json: &str) -> CaptioneerResult<VideoInfo> {
    let root: Value = serde_json::from_str(json)?;
    let streams = root
        .get("streams")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let codec_type = |s: &Value| s.get("codec_type").and_then(Value::as_str).map(str::to_owned);
    let video = streams
        .iter()
        .find(|s| codec_type(s).as_deref() == Some("video"))
        .ok_or_else(|| CaptioneerError::render("input has no video stream"))?;
    let has_audio = streams
        .iter()
        .any(|s| codec_type(s).as_deref() == Some("audio"));

    let dimension = |key: &str| {
        video
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| CaptioneerError::render(format!("video stream has no valid {key}")))
    };
    let width = dimension("width")?;
    let height = dimension("height")?;

    let (frame_rate, fps) = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(Value::as_str))
        .find_map(|raw| parse_frame_rate(raw).map(|fps| (raw.to_string(), fps)))
        .ok_or_else(|| CaptioneerError::render("video stream has no usable frame rate"))?;

    let number = |v: Option<&Value>| -> Option<f64> {
        v.and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    };
    let duration_secs = number(root.get("format").and_then(|f| f.get("duration")))
        .or_else(|| number(video.get("duration")))
        .ok_or_else(|| CaptioneerError::render("could not determine video duration"))?;

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_rate,
        duration_secs,
        has_audio,
    })
}

/// Parse `num/den` or a plain number; zero and non-finite rates are rejected.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse::<f64>().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001",
             "duration": "9.9"},
            {"index": 1, "codec_type": "audio", "sample_rate": "48000"}
        ],
        "format": {"duration": "10.000000"}
    }"#;

    fn job(has_audio: bool, intro: Option<&str>, output: &str) -> RenderJob {
        RenderJob {
            input: PathBuf::from("in.mp4"),
            output: PathBuf::from(output),
            intro_sound: intro.map(PathBuf::from),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            video: VideoInfo {
                width: 1280,
                height: 720,
                fps: 25.0,
                frame_rate: "25/1".to_string(),
                duration_secs: 2.0,
                has_audio,
            },
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn test_parse_probe_json() {
        let info = parse_probe_json(PROBE_JSON).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.frame_rate, "30000/1001");
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!((info.duration_secs - 10.0).abs() < 1e-9);
        assert!(info.has_audio);
        assert_eq!(info.total_frames(), 300);
    }

    #[test]
    fn test_parse_probe_falls_back_to_stream_duration_and_r_frame_rate() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
            "avg_frame_rate": "0/0", "r_frame_rate": "24/1", "duration": "3.5"}],
            "format": {}}"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.frame_rate, "24/1");
        assert!((info.duration_secs - 3.5).abs() < 1e-9);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_parse_probe_requires_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "1.0"}}"#;
        assert!(matches!(
            parse_probe_json(json),
            Err(CaptioneerError::Render { .. })
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("60"), Some(60.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_args_overlay_raw_rgba_stream() {
        let args = build_ffmpeg_args(&job(true, None, "out.mp4"));
        assert_eq!(value_after(&args, "-i"), vec!["in.mp4", "pipe:0"]);
        assert_eq!(value_after(&args, "-s"), vec!["1280x720"]);
        assert_eq!(value_after(&args, "-r"), vec!["25/1"]);
        assert_eq!(value_after(&args, "-pix_fmt"), vec!["rgba"]);
        assert_eq!(value_after(&args, "-map"), vec!["[vout]", "0:a?"]);
        assert_eq!(value_after(&args, "-c:v"), vec!["libx264"]);
        assert_eq!(value_after(&args, "-c:a"), vec!["aac"]);
        assert_eq!(value_after(&args, "-movflags"), vec!["+faststart"]);
        assert_eq!(value_after(&args, "-progress"), vec!["pipe:1"]);
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_args_mix_intro_sound_with_source_audio() {
        let args = build_ffmpeg_args(&job(true, Some("intro.wav"), "out.mkv"));
        assert_eq!(value_after(&args, "-i"), vec!["in.mp4", "pipe:0", "intro.wav"]);
        let filter = value_after(&args, "-filter_complex")[0];
        assert!(filter.contains("[0:a][2:a]amix=inputs=2:duration=first"));
        assert_eq!(value_after(&args, "-map"), vec!["[vout]", "[aout]"]);
        assert!(value_after(&args, "-movflags").is_empty());
        assert!(!args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_args_intro_only_pads_to_video_length() {
        let args = build_ffmpeg_args(&job(false, Some("intro.wav"), "out.mp4"));
        let filter = value_after(&args, "-filter_complex")[0];
        assert!(filter.contains("[2:a]apad[aout]"));
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_args_silent_video_has_no_audio_codec() {
        let args = build_ffmpeg_args(&job(false, None, "out.mp4"));
        assert_eq!(value_after(&args, "-map"), vec!["[vout]"]);
        assert!(value_after(&args, "-c:a").is_empty());
    }

    #[test]
    fn test_progress_state_parses_ffmpeg_keys() {
        let mut state = ProgressState::default();
        state.update("out_time_ms", "1500000");
        assert!((state.out_time_secs - 1.5).abs() < 1e-9);
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("out_time_us", "N/A");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn test_progress_report() {
        let state = ProgressState {
            out_time_secs: 5.0,
            complete: false,
        };
        let report = progress_report(&state, 100, 10.0, 4.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert_eq!(report.frames_rendered, 50);
        assert!((report.eta_secs - 4.0).abs() < 1e-9);
        assert_eq!(report.stage, ExportStage::Rendering);

        let done = ProgressState {
            out_time_secs: 10.0,
            complete: true,
        };
        let report = progress_report(&done, 100, 10.0, 8.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, ExportStage::Finalizing);
    }

    #[test]
    fn test_watch_progress_reports_each_block() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let cb: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p));
        let stream = "frame=10\nout_time_us=1000000\nprogress=continue\n\
                      frame=20\nout_time_us=2000000\nprogress=end\n";
        watch_progress(
            stream.as_bytes(),
            Some(cb),
            50,
            2.0,
            std::time::Instant::now(),
        );
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].frames_rendered, 25);
        assert_eq!(reports[1].stage, ExportStage::Finalizing);
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("captioneer-definitely-missing-binary"));
    }

    #[test]
    fn test_backend_availability_follows_program() {
        assert!(!FfmpegBackend::with_program("captioneer-no-such-ffmpeg").is_available());
        assert_eq!(FfmpegBackend::new().name(), "ffmpeg");
    }

    #[test]
    fn test_probe_missing_file() {
        assert!(matches!(
            probe_video(Path::new("/nonexistent/video.mp4")),
            Err(CaptioneerError::FileNotFound { .. })
        ));
    }
}
