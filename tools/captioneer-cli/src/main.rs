//! Captioneer CLI: burn word-timed captions into a video.
//!
//! Usage:
//!   captioneer <VIDEO> [-o OUTPUT] [-c CONFIG] [--transcript JSON]
//!              [--subtitles PATH] [-v] [--log-json]

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "captioneer",
    about = "Overlay animated, word-timed captions onto a video",
    version,
    author
)]
struct Cli {
    /// Input video
    input: PathBuf,

    /// Output file path (default: <input>_captioned.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Caption configuration file
    #[arg(short, long, default_value = captioneer_common::config::DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Use a saved whisper JSON transcript instead of transcribing
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Also write the captions as an .srt or .vtt file
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Speech recognition backend
    #[arg(long, value_enum, default_value_t = Engine::Cli)]
    engine: Engine,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Where transcripts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// The `whisper` command-line tool
    Cli,
    /// In-process whisper.cpp (requires the `whisper` feature)
    Local,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    captioneer_common::logging::init_logging(&captioneer_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: cli.log_json,
        file: cli.log_file,
    });

    commands::caption::run(commands::caption::CaptionArgs {
        input: cli.input,
        output: cli.output,
        config: cli.config,
        transcript: cli.transcript,
        subtitles: cli.subtitles,
        engine: cli.engine,
    })
}
