//! Captioneer Render Engine
//!
//! Turns caption events into pixels and pixels into a finished video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! font name ── FontResolver ── font file
//!                                  │
//! CaptionEvent ───────────── GlyphRasterizer
//!                                  │
//!                          OverlayCompositor (zoom, placement,
//!                                  │          overlay image)
//!                                  ▼
//!                       raw RGBA frames on stdin
//!                                  │
//! input.mp4 ─────────────────── ffmpeg overlay ── intro sound mix
//!                                  │
//!                                  ▼
//!                          input_captioned.mp4
//! ```

pub mod compositor;
pub mod export;
pub mod fonts;
pub mod raster;

pub use compositor::{CompositorSettings, OverlayCompositor};
pub use export::*;
pub use fonts::FontResolver;
pub use raster::{GlyphRasterizer, GroupRasterizer, TextStyle};
