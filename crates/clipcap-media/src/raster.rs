//! Software rasterization for thumbnails and the cropped preview canvas.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clipcap_types::{MediaError, MediaResult, VideoFrame};
use png::{BitDepth, ColorType, Encoder};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn full(frame: &VideoFrame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width() as f64,
            height: frame.height() as f64,
        }
    }
}

/// Centered crop of a `source_width`x`source_height` frame that matches
/// `aspect_ratio` (width / height) by trimming the wider dimension.
pub fn center_crop(source_width: f64, source_height: f64, aspect_ratio: f64) -> Option<CropRect> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(source_width) || !valid(source_height) || !valid(aspect_ratio) {
        return None;
    }

    let mut rect = CropRect {
        x: 0.0,
        y: 0.0,
        width: source_width,
        height: source_height,
    };
    if source_width / source_height > aspect_ratio {
        rect.width = source_height * aspect_ratio;
        rect.x = (source_width - rect.width) / 2.0;
    } else {
        rect.height = source_width / aspect_ratio;
        rect.y = (source_height - rect.height) / 2.0;
    }
    Some(rect)
}

pub fn stretch(frame: &VideoFrame, width: u32, height: u32) -> Option<VideoFrame> {
    draw_region(frame, CropRect::full(frame), width, height)
}

/// Nearest-neighbour draw of `rect` from `frame` into a new raster. Returns
/// `None` when either side has no pixels to draw.
pub fn draw_region(frame: &VideoFrame, rect: CropRect, width: u32, height: u32) -> Option<VideoFrame> {
    if frame.is_empty() || width == 0 || height == 0 {
        return None;
    }
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }

    let max_x = frame.width() - 1;
    let max_y = frame.height() - 1;
    let step_x = rect.width / width as f64;
    let step_y = rect.height / height as f64;

    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for dy in 0..height {
        let sy = source_index(rect.y + (dy as f64 + 0.5) * step_y, max_y);
        for dx in 0..width {
            let sx = source_index(rect.x + (dx as f64 + 0.5) * step_x, max_x);
            data.extend_from_slice(&frame.pixel(sx, sy)?);
        }
    }
    VideoFrame::new(width, height, data).ok()
}

fn source_index(coordinate: f64, max: u32) -> u32 {
    if !coordinate.is_finite() || coordinate <= 0.0 {
        return 0;
    }
    (coordinate.floor() as u32).min(max)
}

pub fn encode_png(frame: &VideoFrame) -> MediaResult<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, frame.width(), frame.height());
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|err| MediaError::encode(err.to_string()))?;
        writer
            .write_image_data(frame.data())
            .map_err(|err| MediaError::encode(err.to_string()))?;
        writer
            .finish()
            .map_err(|err| MediaError::encode(err.to_string()))?;
    }
    Ok(buffer)
}

pub fn encode_data_uri(frame: &VideoFrame) -> MediaResult<String> {
    let png = encode_png(frame)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}
