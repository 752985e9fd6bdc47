//! Captioneer Caption Model
//!
//! Defines the core data contracts shared by every stage of the pipeline:
//! - **Transcript:** Segments of timestamped words from speech recognition
//! - **Captions:** Word groups and the timed caption events handed to rendering
//! - **Color / Position:** Palette colors and overlay placement specs
//! - **Config:** The merged, validated caption configuration
//!
//! All times are in seconds from the start of the source video.

pub mod caption;
pub mod color;
pub mod config;
pub mod position;
pub mod transcript;

pub use caption::*;
pub use color::*;
pub use config::*;
pub use position::*;
pub use transcript::*;
