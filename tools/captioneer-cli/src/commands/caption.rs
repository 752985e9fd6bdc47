//! Caption a video end to end.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use captioneer_audio_ai::{
    extract_audio, save_subtitles, TranscriptFile, TranscriptSource, TranscriptionConfig,
    WhisperCli, WhisperEngine,
};
use captioneer_caption_model::{CaptionConfig, Transcript};
use captioneer_common::config::{default_output_path, models_dir};
use captioneer_processing_core::{resolve, CaptionGrouper, GrouperConfig};
use captioneer_render_engine::compositor::load_background;
use captioneer_render_engine::export::{
    probe_video, render_captions, ExportProgress, ExportStage, ProgressCallback, RenderJob,
};
use captioneer_render_engine::{
    CompositorSettings, FontResolver, GlyphRasterizer, OverlayCompositor, TextStyle,
};
use image::RgbaImage;

use crate::Engine;

pub struct CaptionArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub config: PathBuf,
    pub transcript: Option<PathBuf>,
    pub subtitles: Option<PathBuf>,
    pub engine: Engine,
}

pub fn run(args: CaptionArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input video not found: {}", args.input.display());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    println!("Captioning: {}", args.input.display());

    let (config, warnings) = CaptionConfig::load(&args.config);
    if !warnings.is_empty() {
        println!(
            "  {} configuration warning(s) in {}",
            warnings.len(),
            args.config.display()
        );
    }

    let video = probe_video(&args.input)
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;
    println!(
        "  Video: {}x{} @ {:.2} fps, {:.1}s",
        video.width, video.height, video.fps, video.duration_secs
    );

    let transcript = load_transcript(&args, &config)?;
    if transcript.word_count() == 0 {
        tracing::warn!("Transcript contains no words; the output will have no captions");
    }

    let grouper = CaptionGrouper::new(GrouperConfig::from(&config));
    let (events, groups) = grouper.group_with_diagnostics(&transcript.segments);
    tracing::info!(
        words = transcript.word_count(),
        groups = groups.len(),
        events = events.len(),
        group_size = grouper.group_size(),
        highlight = config.highlight_words,
        "Built caption events"
    );

    if let Some(path) = &args.subtitles {
        save_subtitles(&events, path)
            .with_context(|| format!("Failed to write subtitles to {}", path.display()))?;
        println!("  Subtitles: {}", path.display());
    }

    let font_path = FontResolver::with_defaults(config.font_download)
        .resolve(&config.font)
        .context("No caption font available")?;
    let rasterizer =
        GlyphRasterizer::from_file(&font_path, TextStyle::from_config(&config, video.width))
            .with_context(|| format!("Failed to load font {}", font_path.display()))?;

    let background = config
        .overlay_image
        .as_deref()
        .and_then(|path| overlay_background(path, &config, video.width, video.height));

    let mut compositor = OverlayCompositor::new(
        events,
        Box::new(rasterizer),
        CompositorSettings {
            width: video.width,
            height: video.height,
            anchor: resolve(&config.position, video.width, video.height),
            zoom_transition: config.zoom_transition,
            background,
        },
    );

    println!("  Output: {}", output.display());
    let job = RenderJob {
        input: args.input,
        output,
        intro_sound: config.intro_sound.clone(),
        video_codec: config.video_codec.clone(),
        audio_codec: config.audio_codec.clone(),
        video,
    };

    let progress_cb: ProgressCallback = Arc::new(print_progress);
    let written = render_captions(job, &mut compositor, Some(progress_cb))
        .context("Caption render failed")?;

    println!("\nDone: {}", written.display());
    Ok(())
}

fn load_transcript(args: &CaptionArgs, config: &CaptionConfig) -> anyhow::Result<Transcript> {
    if let Some(path) = &args.transcript {
        return TranscriptFile::new(path)
            .load()
            .with_context(|| format!("Failed to load transcript {}", path.display()));
    }

    let transcription = TranscriptionConfig {
        model: config.whisper_model,
        language: config.language.clone(),
        threads: 0,
    };
    let source: Box<dyn TranscriptSource> = match args.engine {
        Engine::Cli => Box::new(WhisperCli::new(transcription)),
        Engine::Local => Box::new(WhisperEngine::new(&models_dir(), transcription)?),
    };

    let audio = extract_audio(&args.input).context("Failed to extract audio")?;
    println!("  Transcribing with {}...", source.name());
    let transcript = source
        .transcribe(audio.path())
        .context("Transcription failed")?;
    Ok(transcript)
}

fn overlay_background(
    path: &Path,
    config: &CaptionConfig,
    width: u32,
    height: u32,
) -> Option<RgbaImage> {
    match load_background(path, width, height, config.overlay_opacity) {
        Ok(image) => Some(image),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping overlay image");
            None
        }
    }
}

fn print_progress(p: ExportProgress) {
    match p.stage {
        ExportStage::Rendering | ExportStage::Finalizing => {
            print!(
                "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
                p.progress * 100.0,
                p.frames_rendered,
                p.total_frames,
                p.eta_secs,
            );
            let _ = std::io::stdout().flush();
        }
        ExportStage::Failed => println!("\n  Render failed"),
        ExportStage::Preparing | ExportStage::Complete => {}
    }
}
