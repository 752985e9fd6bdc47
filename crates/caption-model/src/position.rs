//! Caption placement specs.
//!
//! A position is either a named preset or an explicit `[x, y]` pair whose
//! components may be percentages (`"25%"`), fractions (`0.25`), absolute
//! pixels (`640`), or the keyword `"center"`. Resolution against a concrete
//! frame size produces an [`Anchor`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Raw position as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionSpec {
    /// A preset name such as `"bottom"` or `"top-left"`.
    Named(String),
    /// Explicit per-axis coordinates. Valid specs have exactly two.
    Coordinates(Vec<Coordinate>),
    /// Anything else; resolves to an error.
    Unrecognized(serde_json::Value),
}

impl Default for PositionSpec {
    fn default() -> Self {
        PositionSpec::Named("center".to_string())
    }
}

impl PositionSpec {
    pub fn named(name: impl Into<String>) -> Self {
        PositionSpec::Named(name.into())
    }

    pub fn coordinates(x: Coordinate, y: Coordinate) -> Self {
        PositionSpec::Coordinates(vec![x, y])
    }

    /// Convert a TOML value without failing; unsupported shapes become
    /// [`PositionSpec::Unrecognized`].
    pub fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::String(s) => PositionSpec::Named(s.clone()),
            toml::Value::Array(items) => {
                PositionSpec::Coordinates(items.iter().map(Coordinate::from_toml).collect())
            }
            other => PositionSpec::Unrecognized(serde_json::Value::String(other.to_string())),
        }
    }
}

impl fmt::Display for PositionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSpec::Named(name) => write!(f, "\"{name}\""),
            PositionSpec::Coordinates(items) => {
                let parts: Vec<String> = items.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            PositionSpec::Unrecognized(value) => write!(f, "{value}"),
        }
    }
}

/// One axis of an explicit position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
    Unrecognized(serde_json::Value),
}

impl Coordinate {
    fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::Integer(i) => Coordinate::Number(*i as f64),
            toml::Value::Float(f) => Coordinate::Number(*f),
            toml::Value::String(s) => Coordinate::Text(s.clone()),
            other => Coordinate::Unrecognized(serde_json::Value::String(other.to_string())),
        }
    }

    /// Resolve against the size of the corresponding frame dimension.
    pub fn to_axis(&self, dimension: u32) -> Result<AxisAnchor, PositionError> {
        match self {
            Coordinate::Number(n) => number_to_axis(*n, dimension),
            Coordinate::Text(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("center") {
                    return Ok(AxisAnchor::Center);
                }
                if let Some(pct) = text.strip_suffix('%') {
                    let value: f64 = pct
                        .trim()
                        .parse()
                        .map_err(|_| PositionError::InvalidCoordinate(text.to_string()))?;
                    if !value.is_finite() || value < 0.0 {
                        return Err(PositionError::InvalidCoordinate(text.to_string()));
                    }
                    return Ok(fraction_of(value / 100.0, dimension));
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| PositionError::InvalidCoordinate(text.to_string()))?;
                number_to_axis(value, dimension)
            }
            Coordinate::Unrecognized(value) => {
                Err(PositionError::InvalidCoordinate(value.to_string()))
            }
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Number(n) => write!(f, "{n}"),
            Coordinate::Text(s) => write!(f, "\"{s}\""),
            Coordinate::Unrecognized(v) => write!(f, "{v}"),
        }
    }
}

fn number_to_axis(value: f64, dimension: u32) -> Result<AxisAnchor, PositionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PositionError::InvalidCoordinate(value.to_string()));
    }
    if value <= 1.0 {
        Ok(fraction_of(value, dimension))
    } else {
        Ok(AxisAnchor::Pixels(value.round() as i64))
    }
}

fn fraction_of(fraction: f64, dimension: u32) -> AxisAnchor {
    AxisAnchor::Pixels((fraction * f64::from(dimension)).round() as i64)
}

/// Placement along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisAnchor {
    /// Center the overlay on this axis.
    Center,
    /// Overlay's leading edge at this pixel offset.
    Pixels(i64),
}

/// Resolved placement for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub x: AxisAnchor,
    pub y: AxisAnchor,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor {
        x: AxisAnchor::Center,
        y: AxisAnchor::Center,
    };

    pub fn new(x: AxisAnchor, y: AxisAnchor) -> Self {
        Self { x, y }
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::CENTER
    }
}

/// Named placement presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionPreset {
    Center,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Fraction of the frame used as the near-edge inset for presets.
const EDGE_INSET: f64 = 0.05;
/// Vertical start of the bottom band, as a fraction of frame height.
const BOTTOM_BAND: f64 = 0.80;
/// Horizontal start of the right column, as a fraction of frame width.
const RIGHT_COLUMN: f64 = 0.65;

impl PositionPreset {
    /// Anchor for this preset in a `width` x `height` frame.
    pub fn anchor(self, width: u32, height: u32) -> Anchor {
        let left = fraction_of(EDGE_INSET, width);
        let right = fraction_of(RIGHT_COLUMN, width);
        let top = fraction_of(EDGE_INSET, height);
        let bottom = fraction_of(BOTTOM_BAND, height);
        match self {
            PositionPreset::Center => Anchor::CENTER,
            PositionPreset::Top => Anchor::new(AxisAnchor::Center, top),
            PositionPreset::Bottom => Anchor::new(AxisAnchor::Center, bottom),
            PositionPreset::TopLeft => Anchor::new(left, top),
            PositionPreset::TopRight => Anchor::new(right, top),
            PositionPreset::BottomLeft => Anchor::new(left, bottom),
            PositionPreset::BottomRight => Anchor::new(right, bottom),
        }
    }
}

impl FromStr for PositionPreset {
    type Err = PositionError;

    /// Case-insensitive; `-` and spaces are accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "center" | "centre" => Ok(PositionPreset::Center),
            "top" => Ok(PositionPreset::Top),
            "bottom" => Ok(PositionPreset::Bottom),
            "top_left" => Ok(PositionPreset::TopLeft),
            "top_right" => Ok(PositionPreset::TopRight),
            "bottom_left" => Ok(PositionPreset::BottomLeft),
            "bottom_right" => Ok(PositionPreset::BottomRight),
            _ => Err(PositionError::UnknownPreset(s.to_string())),
        }
    }
}

/// Failure to interpret a position spec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("unknown position preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid position coordinate {0}")]
    InvalidCoordinate(String),

    #[error("position must have exactly two coordinates, got {0}")]
    WrongArity(usize),

    #[error("unsupported position value {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_spellings() {
        assert_eq!("Top-Left".parse::<PositionPreset>().unwrap(), PositionPreset::TopLeft);
        assert_eq!("bottom right".parse::<PositionPreset>().unwrap(), PositionPreset::BottomRight);
        assert_eq!("CENTER".parse::<PositionPreset>().unwrap(), PositionPreset::Center);
        assert!("middle".parse::<PositionPreset>().is_err());
    }

    #[test]
    fn test_preset_anchor_fractions() {
        let anchor = PositionPreset::BottomRight.anchor(1000, 500);
        assert_eq!(anchor, Anchor::new(AxisAnchor::Pixels(650), AxisAnchor::Pixels(400)));
        let top = PositionPreset::Top.anchor(1000, 500);
        assert_eq!(top, Anchor::new(AxisAnchor::Center, AxisAnchor::Pixels(25)));
    }

    #[test]
    fn test_coordinate_forms() {
        assert_eq!(Coordinate::Text("50%".into()).to_axis(1080), Ok(AxisAnchor::Pixels(540)));
        assert_eq!(Coordinate::Number(0.5).to_axis(1080), Ok(AxisAnchor::Pixels(540)));
        assert_eq!(Coordinate::Number(300.0).to_axis(1080), Ok(AxisAnchor::Pixels(300)));
        assert_eq!(Coordinate::Text("center".into()).to_axis(1080), Ok(AxisAnchor::Center));
        assert_eq!(Coordinate::Text("120".into()).to_axis(1080), Ok(AxisAnchor::Pixels(120)));
    }

    #[test]
    fn test_coordinate_rejects_malformed() {
        assert!(Coordinate::Number(-3.0).to_axis(100).is_err());
        assert!(Coordinate::Number(f64::NAN).to_axis(100).is_err());
        assert!(Coordinate::Text("abc%".into()).to_axis(100).is_err());
        assert!(Coordinate::Text("left-ish".into()).to_axis(100).is_err());
        assert!(Coordinate::Unrecognized(serde_json::Value::Bool(true))
            .to_axis(100)
            .is_err());
    }

    #[test]
    fn test_from_toml_shapes() {
        let value: toml::Value = toml::from_str::<toml::Table>("p = [\"10%\", 0.8]")
            .unwrap()
            .remove("p")
            .unwrap();
        assert_eq!(
            PositionSpec::from_toml(&value),
            PositionSpec::coordinates(Coordinate::Text("10%".into()), Coordinate::Number(0.8))
        );
        assert!(matches!(
            PositionSpec::from_toml(&toml::Value::Boolean(true)),
            PositionSpec::Unrecognized(_)
        ));
    }

    #[test]
    fn test_json_spec_deserializes_untagged() {
        let spec: PositionSpec = serde_json::from_str(r#"["50%", 0.25]"#).unwrap();
        assert_eq!(
            spec,
            PositionSpec::coordinates(Coordinate::Text("50%".into()), Coordinate::Number(0.25))
        );
        let named: PositionSpec = serde_json::from_str(r#""bottom""#).unwrap();
        assert_eq!(named, PositionSpec::named("bottom"));
    }
}
