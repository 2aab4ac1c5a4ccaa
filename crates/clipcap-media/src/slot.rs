use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{MediaEvents, MediaSource};

/// Shared home of the primary media instance. Every access goes through
/// [`MediaSlot::with`], which turns into a no-op while nothing is attached.
#[derive(Clone, Default)]
pub struct MediaSlot {
    inner: Arc<Mutex<Option<Box<dyn MediaSource>>>>,
}

impl MediaSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, source: Box<dyn MediaSource>) -> MediaEvents {
        let events = source.subscribe();
        *self.inner.lock() = Some(source);
        events
    }

    pub fn detach(&self) -> Option<Box<dyn MediaSource>> {
        self.inner.lock().take()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut dyn MediaSource) -> R) -> Option<R> {
        let mut guard = self.inner.lock();
        let source = guard.as_mut()?;
        Some(f(&mut **source))
    }

    pub fn position(&self) -> Option<f64> {
        self.with(|media| media.position())
    }

    pub fn is_paused(&self) -> Option<bool> {
        self.with(|media| media.is_paused())
    }
}
