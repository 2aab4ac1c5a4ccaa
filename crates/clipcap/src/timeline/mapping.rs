//! Pure conversions between pointer offsets, media time and the progress
//! percentage shown by the timeline indicator.
//!
//! `progress_fraction` clamps its input while `target_time` clamps its output.
//! Both shapes are relied upon by the scrubber and must stay as they are.

use clipcap_types::TimeRange;

/// Widest thumbnail strip that is sampled; wider containers reuse this width.
pub const MAX_CONTAINER_WIDTH: f64 = 16_384.0;

pub fn progress_fraction(x: f64, width: f64) -> Option<f64> {
    if !usable_width(width) || x.is_nan() {
        return None;
    }
    let clamped = x.clamp(0.0, width);
    Some(clamped / width * 100.0)
}

/// Media time for pointer offset `x`. `x` is used unclamped; only the
/// resulting time is clamped into the range.
pub fn target_time(x: f64, width: f64, range: &TimeRange) -> Option<f64> {
    if !usable_width(width) || x.is_nan() || range.is_degenerate() {
        return None;
    }
    let time = range.start + (x / width) * range.duration();
    Some(time.min(range.end).max(range.start))
}

/// Playback progress for the indicator. Capped at 100 but deliberately not
/// floored, so a position before `range.start` reads below zero.
pub fn playback_progress(position: f64, range: &TimeRange) -> Option<f64> {
    if range.is_degenerate() || position.is_nan() {
        return None;
    }
    Some(((position - range.start) / range.duration() * 100.0).min(100.0))
}

pub fn indicator_offset(fraction: f64) -> f64 {
    fraction - 100.0
}

pub fn frame_count(container_width: f64, thumbnail_width: u32) -> usize {
    if thumbnail_width == 0 || !usable_width(container_width) {
        return 0;
    }
    (container_width.min(MAX_CONTAINER_WIDTH) / thumbnail_width as f64).ceil() as usize
}

/// Seek target of slot `index` when `frame_count` slots share the range.
/// Never reaches `range.end`.
pub fn sample_time(range: &TimeRange, index: usize, frame_count: usize) -> f64 {
    let interval = range.duration() / frame_count as f64;
    range.start + index as f64 * interval
}

fn usable_width(width: f64) -> bool {
    width.is_finite() && width > 0.0
}
