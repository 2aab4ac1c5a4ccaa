//! Editor session: owns the primary media slot and routes media events,
//! pointer gestures and key presses to the timeline components.

use std::time::Duration;

use clipcap_media::{MediaEvent, MediaEvents, MediaSlot, MediaSource};
use clipcap_types::TimeRange;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::DEFAULT_CONTAINER_WIDTH;
use crate::timeline::progress::DEFAULT_TICK_INTERVAL;
use crate::timeline::{
    FrameSampler, GuardAction, IndicatorHandle, IndicatorState, PointerButton, PointerListeners,
    PreviewFrames, PreviewStrip, ProgressRenderer, RangeGuard, ScrubController, ScrubUpdate,
    TrackBounds,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    pub tick_interval: Duration,
    pub container_width: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            container_width: DEFAULT_CONTAINER_WIDTH,
        }
    }
}

pub struct EditorSession {
    media: MediaSlot,
    events: Option<MediaEvents>,
    source_url: Option<String>,
    range: TimeRange,
    guard: RangeGuard,
    listeners: PointerListeners,
    scrub: ScrubController,
    indicator: IndicatorHandle,
    progress: ProgressRenderer,
    preview: PreviewStrip,
    container_width: f64,
}

impl EditorSession {
    pub fn new(range: TimeRange, sampler: FrameSampler, config: EditorConfig) -> Self {
        let listeners = PointerListeners::new();
        let indicator = IndicatorHandle::new();
        Self {
            media: MediaSlot::new(),
            events: None,
            source_url: None,
            range,
            guard: RangeGuard::new(range),
            scrub: ScrubController::new(range, listeners.clone()),
            listeners,
            progress: ProgressRenderer::new(range, config.tick_interval, indicator.clone()),
            indicator,
            preview: PreviewStrip::new(sampler),
            container_width: config.container_width,
        }
    }

    pub fn media(&self) -> &MediaSlot {
        &self.media
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn indicator(&self) -> watch::Receiver<IndicatorState> {
        self.indicator.subscribe()
    }

    pub fn preview(&self) -> watch::Receiver<PreviewFrames> {
        self.preview.subscribe()
    }

    pub fn listeners(&self) -> &PointerListeners {
        &self.listeners
    }

    pub fn is_dragging(&self) -> bool {
        self.scrub.is_dragging()
    }

    pub fn is_rendering_progress(&self) -> bool {
        self.progress.is_running()
    }

    pub fn attach_media(&mut self, url: impl Into<String>, source: Box<dyn MediaSource>) {
        self.progress.stop();
        self.scrub.cancel();
        self.events = Some(self.media.attach(source));
        self.media.with(|media| self.guard.initialize(media));
        let url = url.into();
        info!(url = %url, start = self.range.start, end = self.range.end, "media attached");
        self.source_url = Some(url);
        self.refresh_preview();
    }

    pub fn detach_media(&mut self) -> Option<Box<dyn MediaSource>> {
        self.progress.stop();
        self.preview.cancel();
        self.scrub.cancel();
        self.events = None;
        self.source_url = None;
        self.media.detach()
    }

    pub fn set_range(&mut self, range: TimeRange) {
        if range.is_degenerate() {
            warn!(start = range.start, end = range.end, "ignoring degenerate range");
            return;
        }
        self.range = range;
        self.guard.set_range(range);
        self.scrub.set_range(range);
        self.progress.set_range(range, &self.media);
        if !self.scrub.is_dragging() {
            let guard = self.guard;
            self.media.with(|media| {
                if media.position() < range.start {
                    media.seek(range.start);
                } else {
                    guard.on_position_update(media);
                }
            });
        }
        debug!(start = range.start, end = range.end, "range updated");
        self.refresh_preview();
    }

    pub fn set_container_width(&mut self, width: f64) {
        self.container_width = width;
        self.refresh_preview();
    }

    fn refresh_preview(&mut self) {
        let Some(url) = self.source_url.as_deref() else {
            return;
        };
        self.preview.refresh(url, self.range, self.container_width);
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate(_) => {
                // The scrubber owns the playhead while a gesture is active.
                if self.scrub.is_dragging() {
                    return;
                }
                let guard = self.guard;
                if let Some(GuardAction::LoopedBack) =
                    self.media.with(|media| guard.on_position_update(media))
                {
                    info!(start = self.range.start, "playback looped back to range start");
                }
            }
            MediaEvent::Play => {
                if !self.scrub.is_dragging() {
                    self.progress.start(&self.media);
                }
            }
            MediaEvent::Pause => self.progress.stop(),
        }
    }

    pub fn drain_media_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(events) = self.events.as_mut() else {
                return handled;
            };
            match events.try_recv() {
                Ok(event) => {
                    self.handle_media_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "media events lagged");
                }
                Err(TryRecvError::Empty) => return handled,
                Err(TryRecvError::Closed) => {
                    self.events = None;
                    return handled;
                }
            }
        }
    }

    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        client_x: f64,
        track: TrackBounds,
    ) -> Option<ScrubUpdate> {
        let update = self
            .scrub
            .pointer_down(button, client_x, track, &self.media)?;
        self.progress.stop();
        self.indicator.set(update.fraction);
        Some(update)
    }

    /// Window-level move; only reaches the scrubber during a gesture.
    pub fn pointer_move(&mut self, client_x: f64) -> Option<ScrubUpdate> {
        if !self.listeners.is_active() {
            return None;
        }
        let update = self.scrub.pointer_move(client_x, &self.media)?;
        self.indicator.set(update.fraction);
        Some(update)
    }

    /// Window-level release; only reaches the scrubber during a gesture.
    pub fn pointer_up(&mut self) -> bool {
        if !self.listeners.is_active() {
            return false;
        }
        self.scrub.pointer_up(&self.media).is_some()
    }

    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Space => self.toggle_playback().is_some(),
            Key::Other => false,
        }
    }

    pub fn toggle_playback(&mut self) -> Option<bool> {
        self.media.with(|media| {
            if media.is_paused() {
                media.play();
                true
            } else {
                media.pause();
                false
            }
        })
    }

    /// Moves the session onto its own task. The task ends on
    /// [`EditorHandle::shutdown`] or once every handle is dropped, and hands
    /// the session back.
    pub fn spawn(self) -> (EditorHandle, JoinHandle<EditorSession>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = EditorHandle {
            sender,
            indicator: self.indicator(),
            preview: self.preview(),
        };
        let task = tokio::spawn(self.run(receiver));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<EditorCommand>) -> Self {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(EditorCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_media_event(event),
                    None => self.events = None,
                },
            }
        }
        self.progress.stop();
        self.preview.cancel();
        debug!("editor session stopped");
        self
    }

    fn apply(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::PointerDown {
                button,
                client_x,
                track,
            } => {
                self.pointer_down(button, client_x, track);
            }
            EditorCommand::PointerMove(client_x) => {
                self.pointer_move(client_x);
            }
            EditorCommand::PointerUp => {
                self.pointer_up();
            }
            EditorCommand::Key(key) => {
                self.handle_key(key);
            }
            EditorCommand::SetRange(range) => self.set_range(range),
            EditorCommand::SetContainerWidth(width) => self.set_container_width(width),
            EditorCommand::Shutdown => {}
        }
    }
}

async fn next_event(events: &mut Option<MediaEvents>) -> Option<MediaEvent> {
    let Some(receiver) = events.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "media events lagged"),
            Err(RecvError::Closed) => return None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum EditorCommand {
    PointerDown {
        button: PointerButton,
        client_x: f64,
        track: TrackBounds,
    },
    PointerMove(f64),
    PointerUp,
    Key(Key),
    SetRange(TimeRange),
    SetContainerWidth(f64),
    Shutdown,
}

#[derive(Clone)]
pub struct EditorHandle {
    sender: mpsc::UnboundedSender<EditorCommand>,
    indicator: watch::Receiver<IndicatorState>,
    preview: watch::Receiver<PreviewFrames>,
}

impl EditorHandle {
    pub fn pointer_down(&self, button: PointerButton, client_x: f64, track: TrackBounds) {
        let _ = self.sender.send(EditorCommand::PointerDown {
            button,
            client_x,
            track,
        });
    }

    pub fn pointer_move(&self, client_x: f64) {
        let _ = self.sender.send(EditorCommand::PointerMove(client_x));
    }

    pub fn pointer_up(&self) {
        let _ = self.sender.send(EditorCommand::PointerUp);
    }

    pub fn key(&self, key: Key) {
        let _ = self.sender.send(EditorCommand::Key(key));
    }

    pub fn set_range(&self, range: TimeRange) {
        let _ = self.sender.send(EditorCommand::SetRange(range));
    }

    pub fn set_container_width(&self, width: f64) {
        let _ = self.sender.send(EditorCommand::SetContainerWidth(width));
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(EditorCommand::Shutdown);
    }

    pub fn indicator(&self) -> watch::Receiver<IndicatorState> {
        self.indicator.clone()
    }

    pub fn preview(&self) -> watch::Receiver<PreviewFrames> {
        self.preview.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{Call, RecordingOpener};
    use crate::timeline::SamplerConfig;

    const TRACK: TrackBounds = TrackBounds {
        left: 0.0,
        width: 100.0,
    };

    fn session(opener: &RecordingOpener, start: f64, end: f64) -> EditorSession {
        let sampler = FrameSampler::new(Arc::new(opener.clone()), SamplerConfig::default());
        EditorSession::new(
            TimeRange::new(start, end).unwrap(),
            sampler,
            EditorConfig {
                tick_interval: DEFAULT_TICK_INTERVAL,
                container_width: 480.0,
            },
        )
    }

    #[tokio::test]
    async fn attaching_rewinds_to_range_start() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        assert_eq!(editor.media().position(), Some(10.0));
    }

    #[tokio::test]
    async fn attaching_populates_the_preview_strip() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 0.0, 8.0);
        let mut preview = editor.preview();
        editor.attach_media("clip.mp4", opener.open_primary(0.0));

        let thumbnails = loop {
            if let PreviewFrames::Ready(thumbnails) = &*preview.borrow_and_update() {
                break thumbnails.clone();
            }
            preview.changed().await.unwrap();
        };
        assert_eq!(thumbnails.len(), 4);
        // The sampling instance is independent and muted.
        assert_eq!(opener.log().opens()[1], (0.0, true));
    }

    #[tokio::test]
    async fn reaching_range_end_pauses_and_rewinds() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        editor.toggle_playback();
        editor.media().with(|media| media.seek(20.0));
        editor.drain_media_events();

        assert_eq!(editor.media().position(), Some(10.0));
        assert_eq!(editor.media().is_paused(), Some(true));
        assert!(!editor.is_rendering_progress());
    }

    #[tokio::test]
    async fn play_event_starts_progress_and_pause_stops_it() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));

        assert!(editor.handle_key(Key::Space));
        editor.drain_media_events();
        assert!(editor.is_rendering_progress());

        assert!(editor.handle_key(Key::Space));
        editor.drain_media_events();
        assert!(!editor.is_rendering_progress());
        assert!(!editor.handle_key(Key::Other));
    }

    #[tokio::test]
    async fn time_updates_during_a_drag_skip_the_guard() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        editor.drain_media_events();

        editor.pointer_down(PointerButton::Primary, 100.0, TRACK).unwrap();
        editor.drain_media_events();
        // Dragged onto the range end; the guard would otherwise rewind.
        assert_eq!(editor.media().position(), Some(20.0));
        assert!(editor.is_dragging());

        editor.pointer_up();
        assert!(!editor.is_dragging());
    }

    #[tokio::test]
    async fn scrubbing_moves_the_indicator_and_resumes_playback() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        let indicator = editor.indicator();
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        editor.toggle_playback();
        editor.drain_media_events();
        assert!(editor.is_rendering_progress());

        let update = editor.pointer_down(PointerButton::Primary, 30.0, TRACK).unwrap();
        assert_eq!(update.time, 13.0);
        assert!(!editor.is_rendering_progress());
        editor.drain_media_events();
        assert!(!editor.is_rendering_progress());

        editor.pointer_move(60.0).unwrap();
        assert_eq!(indicator.borrow().fraction, 60.0);
        assert_eq!(editor.media().position(), Some(16.0));

        assert!(editor.pointer_up());
        assert_eq!(editor.media().is_paused(), Some(false));
        editor.drain_media_events();
        assert!(editor.is_rendering_progress());
    }

    #[tokio::test]
    async fn window_pointer_events_are_ignored_outside_a_gesture() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        opener.log().clear();

        assert!(editor.pointer_move(50.0).is_none());
        assert!(!editor.pointer_up());
        assert!(opener.log().seeks().is_empty());
        assert_eq!(editor.listeners().active_count(), 0);
    }

    #[tokio::test]
    async fn range_change_clamps_position_and_resamples() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));

        editor.set_range(TimeRange::new(12.0, 18.0).unwrap());
        assert_eq!(editor.media().position(), Some(12.0));

        editor.media().with(|media| media.seek(17.0));
        editor.set_range(TimeRange::new(5.0, 15.0).unwrap());
        assert_eq!(editor.media().position(), Some(5.0));

        let mut preview = editor.preview();
        let first_time = loop {
            if let PreviewFrames::Ready(thumbnails) = &*preview.borrow_and_update() {
                break thumbnails[0].time;
            }
            preview.changed().await.unwrap();
        };
        assert_eq!(first_time, 5.0);
    }

    #[tokio::test]
    async fn degenerate_range_is_ignored() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.set_range(TimeRange {
            start: 30.0,
            end: 30.0,
        });
        assert_eq!(editor.range(), TimeRange::new(10.0, 20.0).unwrap());
    }

    #[test]
    fn commands_without_media_are_no_ops() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        assert_eq!(editor.toggle_playback(), None);
        assert!(!editor.handle_key(Key::Space));
        assert!(editor.pointer_down(PointerButton::Primary, 50.0, TRACK).is_none());
        assert_eq!(editor.drain_media_events(), 0);
    }

    #[tokio::test]
    async fn detaching_releases_the_primary_media() {
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        let detached = editor.detach_media();
        assert!(detached.is_some());
        drop(detached);
        assert!(!editor.media().is_attached());
        assert!(opener.log().calls().contains(&Call::Released));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_session_plays_until_the_range_loops() {
        let opener = RecordingOpener::new(60.0).with_clock(Duration::from_millis(100));
        let mut editor = session(&opener, 10.0, 12.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        let media = editor.media().clone();
        let mut events = media.with(|media| media.subscribe()).unwrap();

        let (handle, task) = editor.spawn();
        handle.key(Key::Space);
        loop {
            if let Ok(MediaEvent::Pause) = events.recv().await {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(media.position(), Some(10.0));
        assert_eq!(media.is_paused(), Some(true));

        handle.shutdown();
        let editor = task.await.unwrap();
        assert!(!editor.is_rendering_progress());
    }

    #[tokio::test]
    async fn handle_routes_drag_and_range_commands() {
        let wait = Duration::from_secs(5);
        let opener = RecordingOpener::new(60.0);
        let mut editor = session(&opener, 10.0, 20.0);
        editor.attach_media("clip.mp4", opener.open_primary(0.0));
        let media = editor.media().clone();

        let (handle, task) = editor.spawn();
        let mut indicator = handle.indicator();
        let mut preview = handle.preview();

        handle.pointer_down(PointerButton::Primary, 30.0, TRACK);
        tokio::time::timeout(wait, indicator.wait_for(|state| state.fraction == 30.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(media.position(), Some(13.0));

        handle.pointer_move(70.0);
        tokio::time::timeout(wait, indicator.wait_for(|state| state.fraction == 70.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(media.position(), Some(17.0));
        handle.pointer_up();

        handle.set_range(TimeRange::new(12.0, 18.0).unwrap());
        handle.set_container_width(240.0);
        let times: Vec<f64> = tokio::time::timeout(
            wait,
            preview.wait_for(|frames| {
                frames
                    .thumbnails()
                    .is_some_and(|thumbs| thumbs.len() == 2 && thumbs[0].time == 12.0)
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .thumbnails()
        .unwrap_or_default()
        .iter()
        .map(|thumb| thumb.time)
        .collect();
        assert_eq!(times, vec![12.0, 15.0]);

        handle.shutdown();
        let editor = task.await.unwrap();
        assert!(!editor.is_dragging());
        assert_eq!(editor.listeners().active_count(), 0);
        assert_eq!(editor.range(), TimeRange::new(12.0, 18.0).unwrap());
        // Still inside the new range, so neither the guard nor the clamp moved it.
        assert_eq!(media.position(), Some(17.0));
        assert_eq!(media.is_paused(), Some(true));
    }
}
