//! Caption placement: position specs to anchors to pixel offsets.

use captioneer_caption_model::{Anchor, AxisAnchor, PositionError, PositionPreset, PositionSpec};

/// Resolve a position spec for a `width` x `height` frame.
///
/// Never fails: malformed specs are logged and resolve to center.
pub fn resolve(spec: &PositionSpec, width: u32, height: u32) -> Anchor {
    match try_resolve(spec, width, height) {
        Ok(anchor) => anchor,
        Err(e) => {
            tracing::warn!(position = %spec, error = %e, "Invalid caption position, using center");
            Anchor::CENTER
        }
    }
}

/// Resolve a position spec, reporting malformed input.
pub fn try_resolve(spec: &PositionSpec, width: u32, height: u32) -> Result<Anchor, PositionError> {
    match spec {
        PositionSpec::Named(name) => Ok(name.parse::<PositionPreset>()?.anchor(width, height)),
        PositionSpec::Coordinates(coords) => match coords.as_slice() {
            [x, y] => Ok(Anchor::new(x.to_axis(width)?, y.to_axis(height)?)),
            other => Err(PositionError::WrongArity(other.len())),
        },
        PositionSpec::Unrecognized(value) => Err(PositionError::Unsupported(value.to_string())),
    }
}

/// Top-left pixel for an `overlay_w` x `overlay_h` overlay at `anchor`.
///
/// Overlays that fit are kept fully inside the frame; larger ones are
/// pinned to the frame origin on that axis.
pub fn place(
    anchor: Anchor,
    overlay_w: u32,
    overlay_h: u32,
    frame_w: u32,
    frame_h: u32,
) -> (i64, i64) {
    (
        place_axis(anchor.x, overlay_w, frame_w),
        place_axis(anchor.y, overlay_h, frame_h),
    )
}

fn place_axis(anchor: AxisAnchor, overlay: u32, frame: u32) -> i64 {
    let overlay = i64::from(overlay);
    let frame = i64::from(frame);
    let raw = match anchor {
        AxisAnchor::Center => (frame - overlay) / 2,
        AxisAnchor::Pixels(p) => p,
    };
    let max = (frame - overlay).max(0);
    raw.clamp(0, max)
}
