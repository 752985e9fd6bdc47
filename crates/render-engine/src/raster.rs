//! Caption rasterization.
//!
//! A caption group is laid out as word-wrapped lines, outlined with the
//! stroke color and filled with the palette color. The highlighted word,
//! if any, is filled with the highlight color instead. The resulting RGBA
//! image is tight around the text block plus margins and stroke.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use captioneer_caption_model::{CaptionConfig, Color, TextAlign};
use captioneer_common::error::{CaptioneerError, CaptioneerResult};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_text_mut;

/// Renders one caption (a group's words, one of them optionally
/// highlighted) into an RGBA image with a transparent background.
pub trait GroupRasterizer {
    fn rasterize(
        &self,
        words: &[String],
        highlight: Option<usize>,
        color: Color,
    ) -> CaptioneerResult<RgbaImage>;
}

/// Visual parameters shared by every caption.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub stroke_color: Color,
    pub stroke_width: u32,
    pub highlight_color: Color,
    pub align: TextAlign,
    /// Horizontal and vertical margins around the text block.
    pub margin: [u32; 2],
    /// Widest allowed caption image, usually the frame width.
    pub max_width: u32,
}

impl TextStyle {
    pub fn from_config(config: &CaptionConfig, frame_width: u32) -> Self {
        Self {
            font_size: config.font_size as f32,
            stroke_color: config.stroke_color,
            stroke_width: config.stroke_width,
            highlight_color: config.highlight_color,
            align: config.text_align,
            margin: config.margin,
            max_width: frame_width,
        }
    }

    /// Horizontal room left for text once margins and stroke are taken.
    pub fn wrap_width(&self) -> u32 {
        self.max_width
            .saturating_sub(2 * (self.margin[0] + self.stroke_width))
            .max(1)
    }
}

/// Position of one word inside the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBox {
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
}

/// Text block layout: word positions plus overall block size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    pub words: Vec<WordBox>,
    pub width: u32,
    pub height: u32,
}

/// Greedy word wrap. Words wider than `max_width` get a line of their own.
pub fn layout_words(
    widths: &[u32],
    space: u32,
    max_width: u32,
    line_height: u32,
    align: TextAlign,
) -> TextLayout {
    let mut lines: Vec<(Vec<usize>, u32)> = Vec::new();
    for (index, &w) in widths.iter().enumerate() {
        let fits = lines
            .last()
            .is_some_and(|(_, line_w)| line_w + space + w <= max_width);
        match lines.last_mut() {
            Some((line, line_w)) if fits => {
                *line_w += space + w;
                line.push(index);
            }
            _ => lines.push((vec![index], w)),
        }
    }

    let block_w = lines.iter().map(|(_, w)| *w).max().unwrap_or(0);
    let mut words = Vec::with_capacity(widths.len());
    for (row, (line, line_w)) in lines.iter().enumerate() {
        let mut x = match align {
            TextAlign::Left => 0,
            TextAlign::Center => (block_w - line_w) / 2,
            TextAlign::Right => block_w - line_w,
        };
        let y = row as u32 * line_height;
        for &index in line {
            words.push(WordBox {
                index,
                x,
                y,
                width: widths[index],
            });
            x += widths[index] + space;
        }
    }

    TextLayout {
        words,
        width: block_w,
        height: lines.len() as u32 * line_height,
    }
}

/// Rasterizer backed by an outline font.
pub struct GlyphRasterizer {
    font: FontVec,
    style: TextStyle,
}

impl GlyphRasterizer {
    pub fn from_file(path: &Path, style: TextStyle) -> CaptioneerResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            CaptioneerError::font(format!("cannot read font {}: {e}", path.display()))
        })?;
        let rasterizer = Self::from_bytes(bytes, style)?;
        tracing::debug!(font = %path.display(), "Loaded caption font");
        Ok(rasterizer)
    }

    pub fn from_bytes(bytes: Vec<u8>, style: TextStyle) -> CaptioneerResult<Self> {
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| CaptioneerError::font(format!("invalid font data: {e}")))?;
        Ok(Self { font, style })
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.style.font_size)
    }

    /// Advance width of `text` in pixels, kerning included.
    fn measure(&self, text: &str) -> u32 {
        let scaled = self.font.as_scaled(self.scale());
        let mut width = 0.0f32;
        let mut previous = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            previous = Some(id);
        }
        width.ceil().max(0.0) as u32
    }

    fn line_height(&self) -> u32 {
        self.font.as_scaled(self.scale()).height().ceil().max(1.0) as u32
    }

    /// Word positions within the text block, before padding.
    pub fn layout(&self, words: &[String]) -> TextLayout {
        let scaled = self.font.as_scaled(self.scale());
        let space = scaled.h_advance(scaled.glyph_id(' ')).ceil() as u32;
        let widths: Vec<u32> = words.iter().map(|w| self.measure(w)).collect();
        layout_words(
            &widths,
            space,
            self.style.wrap_width(),
            self.line_height(),
            self.style.align,
        )
    }

    /// Offset of the text block inside the caption image.
    pub fn padding(&self) -> (u32, u32) {
        let stroke = self.style.stroke_width;
        (self.style.margin[0] + stroke, self.style.margin[1] + stroke)
    }
}

impl GroupRasterizer for GlyphRasterizer {
    fn rasterize(
        &self,
        words: &[String],
        highlight: Option<usize>,
        color: Color,
    ) -> CaptioneerResult<RgbaImage> {
        let scale = self.scale();
        let layout = self.layout(words);
        let stroke = self.style.stroke_width;
        let (pad_x, pad_y) = self.padding();
        let width = (layout.width + 2 * pad_x).max(1);
        let height = (layout.height + 2 * pad_y).max(1);

        let mut canvas = RgbaImage::new(width, height);

        if stroke > 0 && self.style.stroke_color.a > 0 {
            let mut mask = GrayImage::new(width, height);
            for word in &layout.words {
                draw_text_mut(
                    &mut mask,
                    Luma([255u8]),
                    (pad_x + word.x) as i32,
                    (pad_y + word.y) as i32,
                    scale,
                    &self.font,
                    &words[word.index],
                );
            }
            let radius = stroke.min(u32::from(u8::MAX)) as u8;
            let outline = imageproc::morphology::dilate(&mask, Norm::LInf, radius);
            let sc = self.style.stroke_color;
            for (x, y, px) in outline.enumerate_pixels() {
                if px[0] > 0 {
                    let alpha = (u32::from(sc.a) * u32::from(px[0]) / 255) as u8;
                    canvas.put_pixel(x, y, Rgba([sc.r, sc.g, sc.b, alpha]));
                }
            }
        }

        for word in &layout.words {
            let fill = if highlight == Some(word.index) {
                self.style.highlight_color
            } else {
                color
            };
            draw_text_mut(
                &mut canvas,
                Rgba(fill.to_array()),
                (pad_x + word.x) as i32,
                (pad_y + word.y) as i32,
                scale,
                &self.font,
                &words[word.index],
            );
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontRequest, FontStrategy};

    #[test]
    fn test_layout_single_line_centered() {
        let layout = layout_words(&[30, 50], 10, 200, 40, TextAlign::Center);
        assert_eq!(layout.width, 90);
        assert_eq!(layout.height, 40);
        assert_eq!(layout.words[0], WordBox { index: 0, x: 0, y: 0, width: 30 });
        assert_eq!(layout.words[1], WordBox { index: 1, x: 40, y: 0, width: 50 });
    }

    #[test]
    fn test_layout_wraps_and_aligns() {
        let layout = layout_words(&[60, 60, 30], 10, 130, 20, TextAlign::Right);
        assert_eq!(layout.width, 130);
        assert_eq!(layout.height, 40);
        assert_eq!(layout.words[2], WordBox { index: 2, x: 100, y: 20, width: 30 });

        let centered = layout_words(&[60, 60, 30], 10, 130, 20, TextAlign::Center);
        assert_eq!(centered.words[2].x, 50);
    }

    #[test]
    fn test_layout_oversized_word_gets_own_line() {
        let layout = layout_words(&[10, 500, 10], 5, 100, 10, TextAlign::Left);
        let rows: Vec<u32> = layout.words.iter().map(|w| w.y).collect();
        assert_eq!(rows, vec![0, 10, 20]);
        assert_eq!(layout.width, 500);
    }

    #[test]
    fn test_layout_empty() {
        let layout = layout_words(&[], 5, 100, 10, TextAlign::Center);
        assert_eq!((layout.width, layout.height), (0, 0));
    }

    #[test]
    fn test_wrap_width_accounts_for_margin_and_stroke() {
        let style = TextStyle::from_config(&CaptionConfig::default(), 1080);
        assert_eq!(style.wrap_width(), 1080 - 2 * (40 + 6));
    }

    #[test]
    fn test_invalid_font_bytes_rejected() {
        let style = TextStyle::from_config(&CaptionConfig::default(), 1080);
        assert!(matches!(
            GlyphRasterizer::from_bytes(vec![0, 1, 2, 3], style),
            Err(CaptioneerError::Font { .. })
        ));
    }

    fn system_rasterizer(style: TextStyle) -> Option<GlyphRasterizer> {
        let path = crate::fonts::Fallback::default()
            .find(&FontRequest::new("any"))
            .ok()
            .flatten();
        match path {
            Some(path) => GlyphRasterizer::from_file(&path, style).ok(),
            None => {
                eprintln!("no system font installed, skipping");
                None
            }
        }
    }

    #[test]
    fn test_rasterize_with_system_font_when_available() {
        let mut style = TextStyle::from_config(&CaptionConfig::default(), 1080);
        style.font_size = 48.0;
        let Some(rasterizer) = system_rasterizer(style) else {
            return;
        };
        let words = vec!["Hi".to_string(), "there".to_string()];
        let img = rasterizer
            .rasterize(&words, Some(1), Color::rgb(0, 191, 255))
            .unwrap();
        assert!(img.width() > 2 * (40 + 6));
        assert!(img.height() > 2 * (40 + 6));
        assert!(img.pixels().any(|p| p[3] > 0));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_highlighted_word_uses_highlight_color() {
        let palette = Color::rgb(0, 191, 255);
        let highlight = Color::rgb(255, 0, 0);
        let mut style = TextStyle::from_config(&CaptionConfig::default(), 1080);
        style.font_size = 64.0;
        style.stroke_width = 0;
        style.highlight_color = highlight;
        let Some(rasterizer) = system_rasterizer(style) else {
            return;
        };

        let words = vec!["Hi".to_string(), "there".to_string()];
        let img = rasterizer.rasterize(&words, Some(1), palette).unwrap();
        let layout = rasterizer.layout(&words);
        let (pad_x, pad_y) = rasterizer.padding();
        let line_height = layout.height;

        // Opaque pixels only; anti-aliased edges blend toward transparent.
        let is_lit = |p: &Rgba<u8>| p[3] >= 250 && p[0] > 200 && p[2] < 60;
        let is_plain = |p: &Rgba<u8>| p[3] >= 250 && p[2] > 200 && p[0] < 60;
        let colors_in = |word: &WordBox| -> (usize, usize) {
            let (mut plain, mut lit) = (0, 0);
            for y in pad_y + word.y..pad_y + word.y + line_height {
                for x in pad_x + word.x..pad_x + word.x + word.width {
                    let px = img.get_pixel(x, y);
                    if is_plain(px) {
                        plain += 1;
                    } else if is_lit(px) {
                        lit += 1;
                    }
                }
            }
            (plain, lit)
        };

        assert_eq!(layout.words.len(), 2);
        assert_eq!(layout.words[0].y, layout.words[1].y);
        let (plain, lit) = colors_in(&layout.words[0]);
        assert!(plain > 0);
        assert_eq!(lit, 0);
        let (plain, lit) = colors_in(&layout.words[1]);
        assert!(lit > 0);
        assert_eq!(plain, 0);

        let unlit = rasterizer.rasterize(&words, None, palette).unwrap();
        assert!(!unlit.pixels().any(is_lit));
    }
}
