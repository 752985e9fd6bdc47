//! Zoom-in transition for newly shown captions.
//!
//! A caption grows from half size to full size over the first 20% of its
//! visible duration, then holds at full size.

/// Fraction of the caption duration spent zooming in.
pub const TRANSITION_FRACTION: f64 = 0.2;

/// Scale at the instant a caption appears.
pub const START_SCALE: f64 = 0.5;

/// Time-based scale curve for one caption event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransition {
    duration: f64,
    enabled: bool,
}

impl ZoomTransition {
    /// Transition for a caption visible for `duration` seconds.
    pub fn new(duration: f64, enabled: bool) -> Self {
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        Self { duration, enabled }
    }

    /// A transition that always reports full scale.
    pub fn disabled() -> Self {
        Self::new(0.0, false)
    }

    /// Length of the zoom phase in seconds.
    fn transition_secs(&self) -> f64 {
        self.duration * TRANSITION_FRACTION
    }

    /// Scale factor at `t` seconds after the caption appears.
    pub fn scale_at(&self, t: f64) -> f64 {
        if !self.enabled || self.duration <= 0.0 {
            return 1.0;
        }
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
        let window = self.transition_secs();
        if t < window {
            START_SCALE + (1.0 - START_SCALE) * t / window
        } else {
            1.0
        }
    }

    /// Whether `t` falls inside the zoom phase.
    pub fn is_animating(&self, t: f64) -> bool {
        self.scale_at(t) < 1.0
    }
}

/// Scaled size of a `width` x `height` box, at least 1x1 when the input is.
pub fn scaled_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let scale = scale.clamp(0.0, 1.0);
    let w = ((f64::from(width) * scale).round() as u32).clamp(1.min(width), width);
    let h = ((f64::from(height) * scale).round() as u32).clamp(1.min(height), height);
    (w, h)
}
