//! Pointer-driven seeking on the timeline track.
//!
//! A press on the track pauses playback and jumps there; while the gesture is
//! active, window-level move/up listeners stay registered so the drag keeps
//! tracking outside the track. Release resumes playback if it was running
//! when the gesture began.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clipcap_media::MediaSlot;
use clipcap_types::TimeRange;
use tracing::debug;

use super::mapping::{progress_fraction, target_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackBounds {
    pub left: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// Track left edge captured when the gesture began.
    pub origin_x: f64,
    pub track_width: f64,
    pub was_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubUpdate {
    pub fraction: f64,
    pub time: f64,
}

#[derive(Clone, Default)]
pub struct PointerListeners {
    active: Arc<AtomicUsize>,
}

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> ListenerRegistration {
        self.active.fetch_add(1, Ordering::AcqRel);
        ListenerRegistration {
            active: Arc::clone(&self.active),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }
}

/// Deregisters on drop.
pub struct ListenerRegistration {
    active: Arc<AtomicUsize>,
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

enum ScrubState {
    Idle,
    Dragging {
        drag: DragState,
        _listeners: ListenerRegistration,
    },
}

pub struct ScrubController {
    range: TimeRange,
    listeners: PointerListeners,
    state: ScrubState,
}

impl ScrubController {
    pub fn new(range: TimeRange, listeners: PointerListeners) -> Self {
        Self {
            range,
            listeners,
            state: ScrubState::Idle,
        }
    }

    pub fn set_range(&mut self, range: TimeRange) {
        self.range = range;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ScrubState::Dragging { .. })
    }

    pub fn drag_state(&self) -> Option<DragState> {
        match &self.state {
            ScrubState::Idle => None,
            ScrubState::Dragging { drag, .. } => Some(*drag),
        }
    }

    /// Begins a gesture. Ignored for non-primary buttons, a missing media
    /// instance, an unusable track or a degenerate range. A press while
    /// already dragging restarts the gesture.
    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        client_x: f64,
        track: TrackBounds,
        media: &MediaSlot,
    ) -> Option<ScrubUpdate> {
        if button != PointerButton::Primary {
            return None;
        }
        let update = self.map(client_x - track.left, track.width)?;
        let playing_now = media.with(|media| {
            let playing = !media.is_paused();
            media.pause();
            media.seek(update.time);
            playing
        })?;
        // A restarted gesture keeps the state from before the first press.
        let was_playing = playing_now || self.drag_state().is_some_and(|drag| drag.was_playing);

        debug!(time = update.time, was_playing, "scrub started");
        self.state = ScrubState::Dragging {
            drag: DragState {
                origin_x: track.left,
                track_width: track.width,
                was_playing,
            },
            _listeners: self.listeners.register(),
        };
        Some(update)
    }

    pub fn pointer_move(&mut self, client_x: f64, media: &MediaSlot) -> Option<ScrubUpdate> {
        let drag = self.drag_state()?;
        let update = self.map(client_x - drag.origin_x, drag.track_width)?;
        media.with(|media| media.seek(update.time));
        Some(update)
    }

    pub fn pointer_up(&mut self, media: &MediaSlot) -> Option<DragState> {
        let ScrubState::Dragging { drag, .. } = std::mem::replace(&mut self.state, ScrubState::Idle)
        else {
            return None;
        };
        if drag.was_playing {
            media.with(|media| media.play());
        }
        debug!(resumed = drag.was_playing, "scrub finished");
        Some(drag)
    }

    pub fn cancel(&mut self) {
        self.state = ScrubState::Idle;
    }

    fn map(&self, x: f64, width: f64) -> Option<ScrubUpdate> {
        Some(ScrubUpdate {
            fraction: progress_fraction(x, width)?,
            time: target_time(x, width, &self.range)?,
        })
    }
}
