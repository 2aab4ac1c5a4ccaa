use std::sync::Arc;
use std::time::Duration;

use clipcap_types::{MediaError, MediaResult, VideoFrame};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::{FrameReady, MediaEvent, MediaEvents, MediaOpener, MediaSource, OpenOptions};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticOptions {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    /// Wall-clock step of autonomous playback. `None` leaves the playhead to
    /// [`SyntheticMedia::advance`].
    pub clock_tick: Option<Duration>,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            duration: 60.0,
            clock_tick: None,
        }
    }
}

pub struct SyntheticOpener {
    options: SyntheticOptions,
}

impl SyntheticOpener {
    pub fn new(options: SyntheticOptions) -> Self {
        Self { options }
    }
}

impl MediaOpener for SyntheticOpener {
    fn open(&self, url: &str, options: OpenOptions) -> MediaResult<Box<dyn MediaSource>> {
        if url.trim().is_empty() {
            return Err(MediaError::open(url, "empty source url"));
        }
        let media = SyntheticMedia::new(self.options);
        {
            let mut state = media.shared.state.lock();
            state.seek_failed = !(0.0..=self.options.duration).contains(&options.start);
            if options.start.is_finite() {
                state.position = options.start.clamp(0.0, self.options.duration);
            }
        }
        debug!(
            url,
            start = options.start,
            muted = options.muted,
            "opened synthetic media"
        );
        Ok(Box::new(media))
    }
}

struct PlaybackState {
    position: f64,
    paused: bool,
    seek_failed: bool,
}

struct Shared {
    state: Mutex<PlaybackState>,
    events: broadcast::Sender<MediaEvent>,
}

/// Deterministic stand-in for a decoded video: every frame is a gradient whose
/// red channel encodes the playhead, and seeks inside the duration present
/// immediately.
pub struct SyntheticMedia {
    options: SyntheticOptions,
    shared: Arc<Shared>,
    stalled: Vec<oneshot::Sender<()>>,
    clock: Option<JoinHandle<()>>,
}

impl SyntheticMedia {
    pub fn new(options: SyntheticOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            options,
            shared: Arc::new(Shared {
                state: Mutex::new(PlaybackState {
                    position: 0.0,
                    paused: true,
                    seek_failed: false,
                }),
                events,
            }),
            stalled: Vec::new(),
            clock: None,
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        advance_shared(&self.shared, self.options.duration, seconds);
    }

    fn start_clock(&mut self) {
        let Some(tick) = self.options.clock_tick else {
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            debug!("no runtime available; synthetic playback clock not started");
            return;
        };
        self.stop_clock();
        let shared = Arc::clone(&self.shared);
        let duration = self.options.duration;
        self.clock = Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                if !advance_shared(&shared, duration, tick.as_secs_f64()) {
                    break;
                }
            }
        }));
    }

    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }
}

impl Drop for SyntheticMedia {
    fn drop(&mut self) {
        self.stop_clock();
    }
}

fn advance_shared(shared: &Shared, duration: f64, seconds: f64) -> bool {
    let (position, ended) = {
        let mut state = shared.state.lock();
        if state.paused {
            return false;
        }
        state.position = (state.position + seconds).min(duration);
        let ended = state.position >= duration;
        if ended {
            state.paused = true;
        }
        (state.position, ended)
    };
    let _ = shared.events.send(MediaEvent::TimeUpdate(position));
    if ended {
        let _ = shared.events.send(MediaEvent::Pause);
        return false;
    }
    true
}

impl MediaSource for SyntheticMedia {
    fn seek(&mut self, position: f64) {
        let duration = self.options.duration;
        let target = {
            let mut state = self.shared.state.lock();
            state.seek_failed = !(position.is_finite() && (0.0..=duration).contains(&position));
            if position.is_finite() {
                state.position = position.clamp(0.0, duration);
            }
            state.position
        };
        let _ = self.shared.events.send(MediaEvent::TimeUpdate(target));
    }

    fn position(&self) -> f64 {
        self.shared.state.lock().position
    }

    fn is_paused(&self) -> bool {
        self.shared.state.lock().paused
    }

    fn play(&mut self) {
        let started = {
            let mut state = self.shared.state.lock();
            std::mem::replace(&mut state.paused, false)
        };
        if started {
            let _ = self.shared.events.send(MediaEvent::Play);
            self.start_clock();
        }
    }

    fn pause(&mut self) {
        let was_playing = {
            let mut state = self.shared.state.lock();
            !std::mem::replace(&mut state.paused, true)
        };
        self.stop_clock();
        if was_playing {
            let _ = self.shared.events.send(MediaEvent::Pause);
        }
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        let position = self.position();
        let progress = if self.options.duration > 0.0 {
            position / self.options.duration
        } else {
            0.0
        };
        render_pattern(self.options.width, self.options.height, progress)
    }

    fn request_frame(&mut self) -> FrameReady {
        let (tx, rx) = oneshot::channel();
        if self.shared.state.lock().seek_failed {
            // Held open so the receiver waits instead of erroring out.
            self.stalled.push(tx);
        } else {
            let _ = tx.send(());
        }
        rx
    }

    fn subscribe(&self) -> MediaEvents {
        self.shared.events.subscribe()
    }
}

fn render_pattern(width: u32, height: u32, progress: f64) -> Option<VideoFrame> {
    if width == 0 || height == 0 {
        return None;
    }
    let shade = (progress.clamp(0.0, 1.0) * 255.0).round() as u8;
    let x_span = (width - 1).max(1);
    let y_span = (height - 1).max(1);
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        let blue = (y * 255 / y_span) as u8;
        for x in 0..width {
            let green = (x * 255 / x_span) as u8;
            data.extend_from_slice(&[shade, green, blue, 255]);
        }
    }
    VideoFrame::new(width, height, data).ok()
}
