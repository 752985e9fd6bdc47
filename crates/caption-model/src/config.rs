//! Caption configuration loading and validation.
//!
//! The TOML file is parsed into an untyped table first, then every field is
//! read on its own. A bad value only costs that field: it is clamped or
//! replaced by its default and a [`ConfigWarning`] is recorded.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::color::{default_text_colors, Color, Palette};
use crate::position::PositionSpec;
use crate::transcript::WhisperModel;

pub const MIN_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 500;
pub const MAX_STROKE_WIDTH: u32 = 20;

const KNOWN_KEYS: &[&str] = &[
    "number_of_words",
    "font",
    "font_size",
    "text_align",
    "text_colors",
    "highlight_color",
    "stroke_color",
    "stroke_width",
    "margin",
    "highlight_words",
    "zoom_transition",
    "position",
    "overlay_image",
    "overlay_opacity",
    "intro_sound",
    "whisper_model",
    "language",
    "font_download",
    "video_codec",
    "audio_codec",
];

/// Horizontal alignment of wrapped caption lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl std::str::FromStr for TextAlign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(TextAlign::Left),
            "center" | "centre" => Ok(TextAlign::Center),
            "right" => Ok(TextAlign::Right),
            other => Err(format!("unknown text alignment '{other}'")),
        }
    }
}

/// A recoverable problem found while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validated caption configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Words per caption group (>= 1).
    pub number_of_words: usize,

    /// Font family name or path to a font file.
    pub font: String,

    /// Font size in pixels.
    pub font_size: u32,

    pub text_align: TextAlign,

    /// Palette cycled once per caption group.
    pub text_colors: Vec<Color>,

    /// Fill color for the highlighted word.
    pub highlight_color: Color,

    pub stroke_color: Color,

    /// Outline width in pixels.
    pub stroke_width: u32,

    /// Horizontal and vertical margins in pixels.
    pub margin: [u32; 2],

    /// Emit one event per word with the current word emphasized.
    pub highlight_words: bool,

    /// Zoom each caption in over the first fifth of its duration.
    pub zoom_transition: bool,

    pub position: PositionSpec,

    /// Image composited full-frame beneath the captions.
    pub overlay_image: Option<PathBuf>,

    /// Overlay image opacity in `[0, 1]`.
    pub overlay_opacity: f64,

    /// Sound mixed in at the start of the output.
    pub intro_sound: Option<PathBuf>,

    pub whisper_model: WhisperModel,

    /// Decoding language (ISO 639-1).
    pub language: String,

    /// Allow fetching missing fonts from Google Fonts.
    pub font_download: bool,

    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            number_of_words: 1,
            font: "Roboto-Black".to_string(),
            font_size: 100,
            text_align: TextAlign::Center,
            text_colors: default_text_colors(),
            highlight_color: Color::WHITE,
            stroke_color: Color::BLACK,
            stroke_width: 6,
            margin: [40, 40],
            highlight_words: false,
            zoom_transition: true,
            position: PositionSpec::default(),
            overlay_image: None,
            overlay_opacity: 1.0,
            intro_sound: None,
            whisper_model: WhisperModel::Base,
            language: "en".to_string(),
            font_download: true,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl CaptionConfig {
    /// Load from a TOML file. A missing or unreadable file yields defaults;
    /// every recovered problem is logged and returned.
    pub fn load(path: &Path) -> (Self, Vec<ConfigWarning>) {
        let (config, warnings) = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No caption config found, using defaults");
                (Self::default(), Vec::new())
            }
            Err(e) => (
                Self::default(),
                vec![ConfigWarning::new(
                    "<file>",
                    format!("cannot read {}: {e}; using defaults", path.display()),
                )],
            ),
        };

        for warning in &warnings {
            tracing::warn!(field = %warning.field, "{}", warning.message);
        }
        (config, warnings)
    }

    /// Parse TOML text. Syntax errors yield defaults plus one warning.
    pub fn from_toml_str(text: &str) -> (Self, Vec<ConfigWarning>) {
        match text.parse::<toml::Table>() {
            Ok(table) => Self::from_table(&table),
            Err(e) => (
                Self::default(),
                vec![ConfigWarning::new(
                    "<file>",
                    format!("invalid TOML ({}); using defaults", e.message()),
                )],
            ),
        }
    }

    /// Extract and validate every field from an untyped table.
    pub fn from_table(table: &toml::Table) -> (Self, Vec<ConfigWarning>) {
        let defaults = Self::default();
        let mut r = FieldReader {
            table,
            warnings: Vec::new(),
        };

        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                r.warn(key, "unknown key ignored");
            }
        }

        let number_of_words = r
            .integer("number_of_words")
            .map(|n| {
                if n < 1 {
                    r.warn("number_of_words", format!("{n} is below 1; using 1"));
                    1
                } else {
                    n as usize
                }
            })
            .unwrap_or(defaults.number_of_words);

        let font_size = r
            .integer("font_size")
            .map(|n| r.clamp("font_size", n, MIN_FONT_SIZE, MAX_FONT_SIZE))
            .unwrap_or(defaults.font_size);

        let stroke_width = r
            .integer("stroke_width")
            .map(|n| r.clamp("stroke_width", n, 0, MAX_STROKE_WIDTH))
            .unwrap_or(defaults.stroke_width);

        let text_align = r
            .string("text_align")
            .and_then(|s| match s.parse::<TextAlign>() {
                Ok(align) => Some(align),
                Err(msg) => {
                    r.warn("text_align", format!("{msg}; using center"));
                    None
                }
            })
            .unwrap_or(defaults.text_align);

        let text_colors = r.color_list("text_colors").unwrap_or(defaults.text_colors);
        let highlight_color = r
            .color("highlight_color")
            .unwrap_or(defaults.highlight_color);
        let stroke_color = r.color("stroke_color").unwrap_or(defaults.stroke_color);
        let margin = r.margin("margin").unwrap_or(defaults.margin);

        let position = match table.get("position") {
            Some(value) => PositionSpec::from_toml(value),
            None => defaults.position,
        };

        let overlay_opacity = r
            .float("overlay_opacity")
            .map(|v| {
                if !(0.0..=1.0).contains(&v) {
                    let clamped = v.clamp(0.0, 1.0);
                    r.warn(
                        "overlay_opacity",
                        format!("{v} is outside 0.0-1.0; using {clamped}"),
                    );
                    clamped
                } else {
                    v
                }
            })
            .unwrap_or(defaults.overlay_opacity);

        let whisper_model = r
            .string("whisper_model")
            .and_then(|s| match s.parse::<WhisperModel>() {
                Ok(model) => Some(model),
                Err(msg) => {
                    r.warn("whisper_model", format!("{msg}; using base"));
                    None
                }
            })
            .unwrap_or(defaults.whisper_model);

        let config = Self {
            number_of_words,
            font: r.non_empty_string("font").unwrap_or(defaults.font),
            font_size,
            text_align,
            text_colors,
            highlight_color,
            stroke_color,
            stroke_width,
            margin,
            highlight_words: r
                .boolean("highlight_words")
                .unwrap_or(defaults.highlight_words),
            zoom_transition: r
                .boolean("zoom_transition")
                .unwrap_or(defaults.zoom_transition),
            position,
            overlay_image: r.non_empty_string("overlay_image").map(PathBuf::from),
            overlay_opacity,
            intro_sound: r.non_empty_string("intro_sound").map(PathBuf::from),
            whisper_model,
            language: r.non_empty_string("language").unwrap_or(defaults.language),
            font_download: r.boolean("font_download").unwrap_or(defaults.font_download),
            video_codec: r
                .non_empty_string("video_codec")
                .unwrap_or(defaults.video_codec),
            audio_codec: r
                .non_empty_string("audio_codec")
                .unwrap_or(defaults.audio_codec),
        };

        (config, r.warnings)
    }

    /// Fresh palette over the configured text colors.
    pub fn palette(&self) -> Palette {
        Palette::new(self.text_colors.clone())
    }
}

/// Per-field extraction with warning collection.
struct FieldReader<'a> {
    table: &'a toml::Table,
    warnings: Vec<ConfigWarning>,
}

impl FieldReader<'_> {
    fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.warnings.push(ConfigWarning::new(field, message));
    }

    fn wrong_type(&mut self, field: &str, expected: &str, value: &toml::Value) {
        self.warn(
            field,
            format!(
                "expected {expected}, found {}; using default",
                value.type_str()
            ),
        );
    }

    /// Integer value; finite floats are rounded with a warning.
    fn integer(&mut self, field: &str) -> Option<i64> {
        match self.table.get(field)? {
            toml::Value::Integer(n) => Some(*n),
            toml::Value::Float(f) if f.is_finite() => {
                let rounded = f.round() as i64;
                self.warn(field, format!("expected an integer, rounding {f} to {rounded}"));
                Some(rounded)
            }
            other => {
                let other = other.clone();
                self.wrong_type(field, "an integer", &other);
                None
            }
        }
    }

    fn clamp(&mut self, field: &str, value: i64, min: u32, max: u32) -> u32 {
        let clamped = value.clamp(i64::from(min), i64::from(max));
        if clamped != value {
            self.warn(
                field,
                format!("{value} is outside {min}-{max}; using {clamped}"),
            );
        }
        clamped as u32
    }

    fn float(&mut self, field: &str) -> Option<f64> {
        match self.table.get(field)? {
            toml::Value::Float(f) if f.is_finite() => Some(*f),
            toml::Value::Integer(n) => Some(*n as f64),
            other => {
                let other = other.clone();
                self.wrong_type(field, "a number", &other);
                None
            }
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        match self.table.get(field)? {
            toml::Value::Boolean(b) => Some(*b),
            other => {
                let other = other.clone();
                self.wrong_type(field, "a boolean", &other);
                None
            }
        }
    }

    fn string(&mut self, field: &str) -> Option<String> {
        match self.table.get(field)? {
            toml::Value::String(s) => Some(s.clone()),
            other => {
                let other = other.clone();
                self.wrong_type(field, "a string", &other);
                None
            }
        }
    }

    fn non_empty_string(&mut self, field: &str) -> Option<String> {
        let s = self.string(field)?;
        let trimmed = s.trim();
        if trimmed.is_empty() {
            self.warn(field, "empty value; using default");
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn color(&mut self, field: &str) -> Option<Color> {
        let raw = self.string(field)?;
        match raw.parse::<Color>() {
            Ok(color) => Some(color),
            Err(e) => {
                self.warn(field, format!("{e}; using default"));
                None
            }
        }
    }

    /// Valid entries of a color list; `None` when nothing usable remains.
    fn color_list(&mut self, field: &str) -> Option<Vec<Color>> {
        let items = match self.table.get(field)? {
            toml::Value::Array(items) => items.clone(),
            other => {
                let other = other.clone();
                self.wrong_type(field, "a list of colors", &other);
                return None;
            }
        };

        let mut colors = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let parsed = match item {
                toml::Value::String(s) => s.parse::<Color>().map_err(|e| e.to_string()),
                other => Err(format!("expected a color string, found {}", other.type_str())),
            };
            match parsed {
                Ok(color) => colors.push(color),
                Err(msg) => self.warn(&format!("{field}[{i}]"), format!("{msg}; entry dropped")),
            }
        }

        if colors.is_empty() {
            self.warn(field, "no valid colors; using default palette");
            None
        } else {
            Some(colors)
        }
    }

    fn margin(&mut self, field: &str) -> Option<[u32; 2]> {
        let value = self.table.get(field)?.clone();
        let toml::Value::Array(items) = &value else {
            self.wrong_type(field, "a two-element list", &value);
            return None;
        };
        if items.len() != 2 {
            self.warn(
                field,
                format!("expected exactly two values, found {}; using default", items.len()),
            );
            return None;
        }

        let mut out = [0u32; 2];
        for (slot, item) in out.iter_mut().zip(items) {
            let n = match item {
                toml::Value::Integer(n) => *n,
                toml::Value::Float(f) if f.is_finite() => f.round() as i64,
                other => {
                    self.wrong_type(field, "non-negative integers", other);
                    return None;
                }
            };
            if n < 0 {
                self.warn(field, format!("negative margin {n}; using default"));
                return None;
            }
            *slot = n.min(i64::from(u32::MAX)) as u32;
        }
        Some(out)
    }
}
