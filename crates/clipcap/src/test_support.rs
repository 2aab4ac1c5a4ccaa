use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use clipcap_media::backends::synthetic::{SyntheticOpener, SyntheticOptions};
use clipcap_media::{
    FrameReady, MediaEvents, MediaOpener, MediaResult, MediaSource, OpenOptions, VideoFrame,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open { start: f64, muted: bool },
    Seek(f64),
    Play,
    Pause,
    Released,
}

#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Seek(time) => Some(time),
                _ => None,
            })
            .collect()
    }

    pub fn opens(&self) -> Vec<(f64, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Open { start, muted } => Some((start, muted)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Opener over synthetic media that records every call it observes and
/// counts the instances still alive.
#[derive(Clone)]
pub struct RecordingOpener {
    options: SyntheticOptions,
    log: CallLog,
    live: Arc<AtomicUsize>,
    blank_frames: bool,
}

impl RecordingOpener {
    pub fn new(duration: f64) -> Self {
        Self {
            options: SyntheticOptions {
                width: 16,
                height: 9,
                duration,
                clock_tick: None,
            },
            log: CallLog::default(),
            live: Arc::new(AtomicUsize::new(0)),
            blank_frames: false,
        }
    }

    pub fn with_clock(mut self, tick: Duration) -> Self {
        self.options.clock_tick = Some(tick);
        self
    }

    /// Frames present on time but carry no pixels to rasterize.
    pub fn with_blank_frames(mut self) -> Self {
        self.blank_frames = true;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn open_primary(&self, start: f64) -> Box<dyn MediaSource> {
        self.open("clip.mp4", OpenOptions::primary(start))
            .expect("synthetic media opens")
    }
}

impl MediaOpener for RecordingOpener {
    fn open(&self, url: &str, options: OpenOptions) -> MediaResult<Box<dyn MediaSource>> {
        let inner = SyntheticOpener::new(self.options).open(url, options)?;
        self.log.push(Call::Open {
            start: options.start,
            muted: options.muted,
        });
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingMedia {
            inner,
            log: self.log.clone(),
            live: Arc::clone(&self.live),
            blank_frames: self.blank_frames,
        }))
    }
}

pub struct RecordingMedia {
    inner: Box<dyn MediaSource>,
    log: CallLog,
    live: Arc<AtomicUsize>,
    blank_frames: bool,
}

impl Drop for RecordingMedia {
    fn drop(&mut self) {
        self.log.push(Call::Released);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MediaSource for RecordingMedia {
    fn seek(&mut self, position: f64) {
        self.log.push(Call::Seek(position));
        self.inner.seek(position);
    }

    fn position(&self) -> f64 {
        self.inner.position()
    }

    fn is_paused(&self) -> bool {
        self.inner.is_paused()
    }

    fn play(&mut self) {
        self.log.push(Call::Play);
        self.inner.play();
    }

    fn pause(&mut self) {
        self.log.push(Call::Pause);
        self.inner.pause();
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if self.blank_frames {
            return None;
        }
        self.inner.current_frame()
    }

    fn request_frame(&mut self) -> FrameReady {
        self.inner.request_frame()
    }

    fn subscribe(&self) -> MediaEvents {
        self.inner.subscribe()
    }
}
