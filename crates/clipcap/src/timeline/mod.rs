pub mod cropper;
pub mod mapping;
pub mod preview;
pub mod progress;
pub mod range_guard;
pub mod sampler;
pub mod scrub;

use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::watch;

use mapping::indicator_offset;

pub use cropper::{MountedPreview, PreviewCropper};
pub use preview::{PreviewFrames, PreviewStrip};
pub use progress::ProgressRenderer;
pub use range_guard::{GuardAction, RangeGuard};
pub use sampler::{FrameSampler, RunToken, SamplerConfig, SamplerRun};
pub use scrub::{PointerButton, PointerListeners, ScrubController, ScrubUpdate, TrackBounds};

pub struct StreamBundle<T> {
    pub stream: Pin<Box<dyn Stream<Item = T> + Send>>,
    pub total_frames: usize,
}

impl<T> StreamBundle<T> {
    pub fn new(stream: Pin<Box<dyn Stream<Item = T> + Send>>, total_frames: usize) -> Self {
        Self {
            stream,
            total_frames,
        }
    }
}

/// Position of the progress indicator, as a percentage of the track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorState {
    pub fraction: f64,
}

impl IndicatorState {
    pub fn offset_percent(&self) -> f64 {
        indicator_offset(self.fraction)
    }
}

/// Shared writer for the indicator. Both the progress renderer and the
/// scrubber publish through the same handle so the last write wins.
#[derive(Clone)]
pub struct IndicatorHandle {
    sender: Arc<watch::Sender<IndicatorState>>,
}

impl Default for IndicatorHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(IndicatorState::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn set(&self, fraction: f64) {
        self.sender.send_replace(IndicatorState { fraction });
    }

    pub fn current(&self) -> IndicatorState {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<IndicatorState> {
        self.sender.subscribe()
    }
}
