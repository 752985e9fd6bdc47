//! captioneer-font: fetch a Google Font for use in captions.
//!
//! Usage:
//!   captioneer-font <NAME> [--weight N] [--dir DIR]
//!
//! `NAME` may carry a weight suffix (`Roboto-Black`); the file is saved as
//! `<NAME>.ttf` so the caption font lookup finds it by the same name.

use std::path::PathBuf;

use anyhow::Context;
use captioneer_render_engine::fonts::{download_google_font, FontRequest};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "captioneer-font",
    about = "Download a Google Font into the caption font cache",
    version,
    author
)]
struct Cli {
    /// Font name, e.g. "Roboto-Black" or "Open Sans"
    name: String,

    /// Weight override (100-900)
    #[arg(long)]
    weight: Option<u16>,

    /// Destination directory (default: user font cache)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    captioneer_common::logging::init_logging(&captioneer_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    let request = FontRequest::new(&cli.name);
    if request.name.is_empty() {
        anyhow::bail!("Font name must not be empty");
    }
    let (family, parsed_weight) = request.family_and_weight();
    let weight = cli.weight.unwrap_or(parsed_weight);
    if !(100..=900).contains(&weight) {
        anyhow::bail!("Font weight must be between 100 and 900, got {weight}");
    }

    let dest = cli
        .dir
        .unwrap_or_else(captioneer_common::config::font_cache_dir);
    let path = download_google_font(&family, Some(weight), &request.name, &dest)
        .with_context(|| format!("Failed to download font '{}'", request.name))?;

    println!("{}", path.display());
    Ok(())
}
