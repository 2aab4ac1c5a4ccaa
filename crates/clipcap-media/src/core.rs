use std::sync::Arc;

use clipcap_types::{MediaResult, VideoFrame};
use tokio::sync::{broadcast, oneshot};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Natural time progression during playback, and seek completion.
    TimeUpdate(f64),
    Play,
    Pause,
}

/// Resolves once the decoder presents the next frame. A dropped sender means
/// the frame will never arrive.
pub type FrameReady = oneshot::Receiver<()>;

pub type MediaEvents = broadcast::Receiver<MediaEvent>;

pub trait MediaSource: Send {
    fn seek(&mut self, position: f64);
    fn position(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn current_frame(&self) -> Option<VideoFrame>;
    fn request_frame(&mut self) -> FrameReady;
    fn subscribe(&self) -> MediaEvents;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOptions {
    pub muted: bool,
    pub anonymous_cors: bool,
    pub start: f64,
}

impl OpenOptions {
    pub fn primary(start: f64) -> Self {
        Self {
            muted: false,
            anonymous_cors: true,
            start,
        }
    }

    /// Independent muted instance that never touches the primary player.
    pub fn sampling(start: f64) -> Self {
        Self {
            muted: true,
            anonymous_cors: true,
            start,
        }
    }
}

pub trait MediaOpener: Send + Sync {
    fn open(&self, url: &str, options: OpenOptions) -> MediaResult<Box<dyn MediaSource>>;
}

pub type DynMediaOpener = Arc<dyn MediaOpener>;
