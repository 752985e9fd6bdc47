//! Frame compositor: turns timed caption events into full-frame RGBA
//! overlays.
//!
//! Each output frame is a transparent canvas the size of the video. The
//! optional overlay image is drawn first, then every caption event active at
//! the frame time, rasterized once and cached until the event ends.

use std::collections::HashMap;
use std::path::Path;

use captioneer_caption_model::{Anchor, CaptionEvent};
use captioneer_common::error::{CaptioneerError, CaptioneerResult};
use captioneer_processing_core::layout::place;
use captioneer_processing_core::zoom::{scaled_size, ZoomTransition};
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::raster::GroupRasterizer;

/// Scale `caption` about its center, keeping the original canvas size.
///
/// The scaled image is drawn onto a transparent canvas of the unscaled
/// dimensions, so downstream placement never shifts during a zoom.
pub fn apply_zoom(caption: &RgbaImage, scale: f64) -> RgbaImage {
    let (width, height) = caption.dimensions();
    if scale >= 1.0 || width == 0 || height == 0 {
        return caption.clone();
    }

    let (sw, sh) = scaled_size(width, height, scale);
    let resized = imageops::resize(caption, sw, sh, FilterType::Lanczos3);
    let mut canvas = RgbaImage::new(width, height);
    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from((width - sw) / 2),
        i64::from((height - sh) / 2),
    );
    canvas
}

/// Load the overlay image, stretch it to the frame and apply `opacity`.
pub fn load_background(
    path: &Path,
    width: u32,
    height: u32,
    opacity: f64,
) -> CaptioneerResult<RgbaImage> {
    if !path.exists() {
        return Err(CaptioneerError::file_not_found(path));
    }
    let decoded = image::open(path).map_err(|e| {
        CaptioneerError::render(format!("cannot decode overlay image {}: {e}", path.display()))
    })?;
    let mut background = imageops::resize(&decoded.to_rgba8(), width, height, FilterType::Triangle);
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity < 1.0 {
        for px in background.pixels_mut() {
            px[3] = (f64::from(px[3]) * opacity).round() as u8;
        }
    }
    Ok(background)
}

/// Frame-level settings for the compositor.
#[derive(Debug, Clone)]
pub struct CompositorSettings {
    pub width: u32,
    pub height: u32,
    pub anchor: Anchor,
    pub zoom_transition: bool,
    pub background: Option<RgbaImage>,
}

/// Produces the caption overlay for any frame time.
pub struct OverlayCompositor {
    events: Vec<CaptionEvent>,
    rasterizer: Box<dyn GroupRasterizer>,
    settings: CompositorSettings,
    cache: HashMap<usize, RgbaImage>,
}

impl OverlayCompositor {
    /// Build a compositor. Events are ordered by start time; zero-length
    /// events are dropped since they are never visible.
    pub fn new(
        events: Vec<CaptionEvent>,
        rasterizer: Box<dyn GroupRasterizer>,
        settings: CompositorSettings,
    ) -> Self {
        let total = events.len();
        let mut events: Vec<CaptionEvent> =
            events.into_iter().filter(|e| e.duration() > 0.0).collect();
        events.sort_by(|a, b| a.start.total_cmp(&b.start));
        if events.len() < total {
            tracing::debug!(
                skipped = total - events.len(),
                "Dropped zero-duration caption events"
            );
        }

        Self {
            events,
            rasterizer,
            settings,
            cache: HashMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.settings.width
    }

    pub fn height(&self) -> u32 {
        self.settings.height
    }

    /// Caption events that will be drawn, in start order.
    pub fn events(&self) -> &[CaptionEvent] {
        &self.events
    }

    /// Overlay for the frame at `t` seconds.
    pub fn render_frame(&mut self, t: f64) -> CaptioneerResult<RgbaImage> {
        let (width, height) = (self.settings.width, self.settings.height);
        let mut frame = match &self.settings.background {
            Some(background) => background.clone(),
            None => RgbaImage::new(width, height),
        };

        let events = &self.events;
        self.cache.retain(|&index, _| t < events[index].end);

        for index in 0..self.events.len() {
            let event = &self.events[index];
            if event.start > t {
                break;
            }
            if !event.is_active_at(t) {
                continue;
            }

            if !self.cache.contains_key(&index) {
                let caption =
                    self.rasterizer
                        .rasterize(&event.words, event.highlight_index, event.color)?;
                tracing::trace!(
                    index,
                    text = %event.text(),
                    highlight = event.highlighted_word().unwrap_or(""),
                    width = caption.width(),
                    height = caption.height(),
                    "Rasterized caption"
                );
                self.cache.insert(index, caption);
            }
            let Some(caption) = self.cache.get(&index) else {
                continue;
            };

            let zoom = if event.has_transition {
                ZoomTransition::new(event.duration(), self.settings.zoom_transition)
            } else {
                ZoomTransition::disabled()
            };
            let elapsed = t - event.start;
            let (x, y) = place(
                self.settings.anchor,
                caption.width(),
                caption.height(),
                width,
                height,
            );
            if zoom.is_animating(elapsed) {
                let zoomed = apply_zoom(caption, zoom.scale_at(elapsed));
                imageops::overlay(&mut frame, &zoomed, x, y);
            } else {
                imageops::overlay(&mut frame, caption, x, y);
            }
        }

        Ok(frame)
    }

    /// Number of rasterized captions currently held.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
