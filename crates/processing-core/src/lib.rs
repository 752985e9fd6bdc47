//! Captioneer Processing Core: the caption timing engine
//!
//! Turns transcript words into renderable caption decisions:
//! - **Grouper:** Pack words into N-word captions and emit timed events
//! - **Zoom:** Time-based scale factor for the caption entry transition
//! - **Layout:** Resolve position specs into anchors and pixel placements
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod grouper;
pub mod layout;
pub mod zoom;

pub use grouper::{CaptionGrouper, GrouperConfig};
pub use layout::{place, resolve, try_resolve};
pub use zoom::ZoomTransition;
