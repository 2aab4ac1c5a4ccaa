use std::time::Duration;

use clipcap_media::MediaSlot;
use clipcap_types::TimeRange;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::IndicatorHandle;
use super::mapping::playback_progress;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

pub struct ProgressRenderer {
    range: TimeRange,
    tick: Duration,
    indicator: IndicatorHandle,
    task: Option<JoinHandle<()>>,
}

impl ProgressRenderer {
    pub fn new(range: TimeRange, tick: Duration, indicator: IndicatorHandle) -> Self {
        Self {
            range,
            tick,
            indicator,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts (or restarts) the tick loop. At most one loop is ever live.
    pub fn start(&mut self, media: &MediaSlot) {
        self.stop();
        if self.range.is_degenerate() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("no runtime available; progress renderer not started");
            return;
        };

        let media = media.clone();
        let range = self.range;
        let indicator = self.indicator.clone();
        let tick = self.tick;
        self.task = Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !render_tick(&media, &range, &indicator) {
                    break;
                }
            }
            debug!("progress renderer stopped");
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn set_range(&mut self, range: TimeRange, media: &MediaSlot) {
        self.range = range;
        if self.is_running() {
            self.start(media);
        }
    }
}

impl Drop for ProgressRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Publishes one indicator update. Returns false once the loop should end.
pub fn render_tick(media: &MediaSlot, range: &TimeRange, indicator: &IndicatorHandle) -> bool {
    let Some((position, paused)) = media.with(|media| (media.position(), media.is_paused()))
    else {
        return false;
    };
    if let Some(progress) = playback_progress(position, range) {
        indicator.set(progress);
    }
    !paused
}
