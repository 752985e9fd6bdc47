//! Logging configuration and standard file locations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Conventional caption config filename, looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "captions.toml";

/// Suffix appended to the input's base name when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_captioned";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "captioneer=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Default config path: `captions.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILENAME)
}

/// Derive `<base>_captioned<.ext>` next to the input video.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    input.with_file_name(file_name)
}

/// Project-local font directory, searched before the user cache.
pub fn local_fonts_dir() -> PathBuf {
    PathBuf::from("fonts")
}

/// User cache directory for downloaded fonts.
pub fn font_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("captioneer")
        .join("fonts")
}

/// Directory holding whisper.cpp model files.
pub fn models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("captioneer")
        .join("models")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path_appends_suffix() {
        let out = default_output_path(Path::new("/videos/clip.mp4"));
        assert_eq!(out, PathBuf::from("/videos/clip_captioned.mp4"));
    }

    #[test]
    fn test_default_output_path_without_extension() {
        let out = default_output_path(Path::new("clip"));
        assert_eq!(out, PathBuf::from("clip_captioned"));
    }

    #[test]
    fn test_default_output_path_keeps_inner_dots() {
        let out = default_output_path(Path::new("my.video.mov"));
        assert_eq!(out, PathBuf::from("my.video_captioned.mov"));
    }

    #[test]
    fn test_font_cache_dir_is_namespaced() {
        let dir = font_cache_dir();
        assert!(dir.ends_with("captioneer/fonts"));
    }
}
