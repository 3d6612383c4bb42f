//! Text annotation drawn on top of finished frames.
//!
//! Three labels: location in the top-left corner, local and UTC time in the
//! bottom-left, and the frame's feature values in the bottom-right. Each
//! sits on a translucent dark box so it stays readable on light palettes.

use chrono::{DateTime, FixedOffset, Utc};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use weather_common::Location;

use crate::error::{RenderError, RenderResult};
use crate::features::FeatureState;

/// Embedded font data - DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const MARGIN: i32 = 4;
const PADDING: i32 = 2;

/// Backing box opacity of the top label
const TOP_BOX_ALPHA: f32 = 0.18;
/// Backing box opacity of the bottom labels
const BOTTOM_BOX_ALPHA: f32 = 0.15;

/// The three label strings of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLabels {
    pub top_left: String,
    pub bottom_left: String,
    pub bottom_right: String,
}

impl FrameLabels {
    pub fn new(location: &Location, timestamp: DateTime<Utc>, features: &FeatureState) -> Self {
        Self {
            top_left: location_label(location),
            bottom_left: time_label(timestamp, location.fixed_offset()),
            bottom_right: feature_label(features),
        }
    }
}

/// `"Shenzhen  (22.5431, 114.0579)"`
pub fn location_label(location: &Location) -> String {
    format!(
        "{}  ({:.4}, {:.4})",
        location.name, location.latitude, location.longitude
    )
}

/// `"2024-05-01 20:00 UTC+08:00 / 12:00 UTC"`
pub fn time_label(timestamp: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = timestamp.with_timezone(&offset);
    format!(
        "{} {} / {} UTC",
        local.format("%Y-%m-%d %H:%M"),
        offset_label(offset),
        timestamp.format("%H:%M")
    )
}

/// `"UTC+08:00"`, `"UTC-03:30"`
fn offset_label(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// `"T:0.62 RH:0.40 W:0.31 C:0.77"`
pub fn feature_label(features: &FeatureState) -> String {
    format!(
        "T:{:.2} RH:{:.2} W:{:.2} C:{:.2}",
        features.amplitude, features.warmth, features.drift, features.haze
    )
}

/// Draws [`FrameLabels`] onto frames. Holds only the parsed font, so one
/// instance can annotate frames from several threads.
pub struct Overlay {
    font: Font<'static>,
    scale: Scale,
}

impl Overlay {
    pub const DEFAULT_FONT_SIZE: f32 = 11.0;

    pub fn new() -> RenderResult<Self> {
        Self::with_font_size(Self::DEFAULT_FONT_SIZE)
    }

    pub fn with_font_size(size: f32) -> RenderResult<Self> {
        let font = Font::try_from_bytes(FONT_DATA)
            .ok_or_else(|| RenderError::Overlay("embedded font failed to parse".to_string()))?;
        Ok(Self {
            font,
            scale: Scale::uniform(size),
        })
    }

    /// Pixel size of `text` as drawn.
    pub fn measure(&self, text: &str) -> (i32, i32) {
        text_size(self.scale, &self.font, text)
    }

    /// Draw all three labels.
    pub fn annotate(&self, image: &mut RgbImage, labels: &FrameLabels) {
        let (width, height) = (image.width() as i32, image.height() as i32);
        let line_height = self.scale.y.ceil() as i32;
        let bottom_y = height - MARGIN - line_height;

        self.draw_label(image, &labels.top_left, MARGIN, MARGIN, TOP_BOX_ALPHA);
        self.draw_label(image, &labels.bottom_left, MARGIN, bottom_y, BOTTOM_BOX_ALPHA);

        let (text_w, _) = self.measure(&labels.bottom_right);
        let right_x = width - MARGIN - text_w;
        self.draw_label(image, &labels.bottom_right, right_x, bottom_y, BOTTOM_BOX_ALPHA);
    }

    fn draw_label(&self, image: &mut RgbImage, text: &str, x: i32, y: i32, box_alpha: f32) {
        if text.is_empty() {
            return;
        }
        let (text_w, _) = self.measure(text);
        let text_h = self.scale.y.ceil() as i32;
        darken_box(
            image,
            x - PADDING,
            y - PADDING,
            text_w + 2 * PADDING,
            text_h + 2 * PADDING,
            box_alpha,
        );
        draw_text_mut(image, TEXT_COLOR, x, y, self.scale, &self.font, text);
    }
}

/// Blend a black rectangle over `image` with opacity `alpha`, clipped to
/// the image bounds.
fn darken_box(image: &mut RgbImage, x: i32, y: i32, w: i32, h: i32, alpha: f32) {
    let keep = 1.0 - alpha.clamp(0.0, 1.0);
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x + w).clamp(0, image.width() as i32) as u32;
    let y1 = (y + h).clamp(0, image.height() as i32) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let pixel = image.get_pixel_mut(px, py);
            for c in pixel.0.iter_mut() {
                *c = (*c as f32 * keep).round() as u8;
            }
        }
    }
}
