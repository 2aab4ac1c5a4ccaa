use std::time::Duration;

use clipcap_media::raster::{center_crop, draw_region};
use clipcap_media::{MediaSlot, VideoFrame};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub const DEFAULT_ASPECT_RATIO: f64 = 9.0 / 16.0;
pub const DEFAULT_CANVAS_WIDTH: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewCropper {
    aspect_ratio: f64,
    canvas_width: u32,
    canvas_height: u32,
}

impl Default for PreviewCropper {
    fn default() -> Self {
        Self {
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: (DEFAULT_CANVAS_WIDTH as f64 / DEFAULT_ASPECT_RATIO).round() as u32,
        }
    }
}

impl PreviewCropper {
    pub fn new(aspect_ratio: f64, canvas_width: u32) -> Option<Self> {
        if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) || canvas_width == 0 {
            return None;
        }
        let canvas_height = (canvas_width as f64 / aspect_ratio).round();
        if !(canvas_height >= 1.0 && canvas_height <= u32::MAX as f64) {
            return None;
        }
        Some(Self {
            aspect_ratio,
            canvas_width,
            canvas_height: canvas_height as u32,
        })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn render(&self, frame: &VideoFrame) -> Option<VideoFrame> {
        let rect = center_crop(
            frame.width() as f64,
            frame.height() as f64,
            self.aspect_ratio,
        )?;
        draw_region(frame, rect, self.canvas_width, self.canvas_height)
    }

    /// Redraws the canvas every `tick` for as long as the returned handle
    /// lives, whether or not the media is playing.
    pub fn mount(self, media: MediaSlot, tick: Duration) -> MountedPreview {
        let (canvas, receiver) = watch::channel(None);
        let Ok(handle) = Handle::try_current() else {
            warn!("no runtime available; preview canvas not mounted");
            return MountedPreview {
                canvas: receiver,
                task: None,
            };
        };
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(frame) = media.with(|media| media.current_frame()).flatten() else {
                    continue;
                };
                if let Some(rendered) = self.render(&frame) {
                    canvas.send_replace(Some(rendered));
                }
            }
        });
        debug!(
            width = self.canvas_width,
            height = self.canvas_height,
            "preview canvas mounted"
        );
        MountedPreview {
            canvas: receiver,
            task: Some(task),
        }
    }
}

pub struct MountedPreview {
    canvas: watch::Receiver<Option<VideoFrame>>,
    task: Option<JoinHandle<()>>,
}

impl MountedPreview {
    pub fn canvas(&self) -> watch::Receiver<Option<VideoFrame>> {
        self.canvas.clone()
    }

    pub fn latest(&self) -> Option<VideoFrame> {
        self.canvas.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for MountedPreview {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingOpener;

    fn split_frame() -> VideoFrame {
        // 16x9, left half black, right half white.
        let mut data = Vec::with_capacity(16 * 9 * 4);
        for _ in 0..9 {
            for x in 0..16u32 {
                let value = if x < 8 { 0 } else { 255 };
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }
        VideoFrame::new(16, 9, data).unwrap()
    }

    #[test]
    fn default_canvas_is_portrait() {
        let cropper = PreviewCropper::default();
        assert_eq!(cropper.canvas_size(), (360, 640));
        assert_eq!(PreviewCropper::new(9.0 / 16.0, 360), Some(cropper));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(PreviewCropper::new(0.0, 360).is_none());
        assert!(PreviewCropper::new(f64::NAN, 360).is_none());
        assert!(PreviewCropper::new(1.0, 0).is_none());
    }

    #[test]
    fn render_keeps_the_center_of_wide_frames() {
        let cropper = PreviewCropper::new(1.0, 4).unwrap();
        let out = cropper.render(&split_frame()).unwrap();
        assert_eq!((out.width(), out.height()), (4, 4));
        // 9x9 crop starting at x=3.5 straddles the black/white split.
        assert_eq!(out.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(out.pixel(3, 3), Some([255, 255, 255, 255]));
    }

    #[tokio::test(start_paused = true)]
    async fn mounted_canvas_redraws_and_stops_on_drop() {
        let opener = RecordingOpener::new(60.0);
        let media = MediaSlot::new();
        let _events = media.attach(opener.open_primary(30.0));
        let cropper = PreviewCropper::new(1.0, 6).unwrap();

        let mounted = cropper.mount(media.clone(), Duration::from_millis(16));
        let mut canvas = mounted.canvas();
        canvas.changed().await.unwrap();
        let frame = mounted.latest().unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 6));
        assert!(mounted.is_mounted());

        drop(mounted);
        assert!(canvas.changed().await.is_err());
    }

    #[test]
    fn mount_without_runtime_is_inert() {
        let mounted = PreviewCropper::default().mount(MediaSlot::new(), Duration::from_millis(16));
        assert!(!mounted.is_mounted());
        assert!(mounted.latest().is_none());
    }
}
