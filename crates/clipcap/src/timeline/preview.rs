use std::sync::Arc;

use clipcap_types::{Thumbnail, TimeRange};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::mapping::frame_count;
use super::sampler::{FrameSampler, RunToken, SamplerRun};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviewFrames {
    #[default]
    Loading,
    Ready(Vec<Thumbnail>),
}

impl PreviewFrames {
    pub fn thumbnails(&self) -> Option<&[Thumbnail]> {
        match self {
            PreviewFrames::Loading => None,
            PreviewFrames::Ready(thumbnails) => Some(thumbnails),
        }
    }
}

/// Background thumbnail strip. Each refresh replaces the previous collection
/// and only the newest one may publish.
pub struct PreviewStrip {
    sampler: FrameSampler,
    frames: Arc<watch::Sender<PreviewFrames>>,
    task: Option<JoinHandle<()>>,
}

impl PreviewStrip {
    pub fn new(sampler: FrameSampler) -> Self {
        let (frames, _) = watch::channel(PreviewFrames::Loading);
        Self {
            sampler,
            frames: Arc::new(frames),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PreviewFrames> {
        self.frames.subscribe()
    }

    pub fn frames(&self) -> PreviewFrames {
        self.frames.borrow().clone()
    }

    pub fn refresh(&mut self, url: &str, range: TimeRange, container_width: f64) -> Option<RunToken> {
        self.abort_task();
        let count = frame_count(container_width, self.sampler.config().thumbnail_width);
        let run = self.sampler.sample(url, range, count);
        self.frames.send_replace(PreviewFrames::Loading);

        let token = run.token.clone();
        let Ok(handle) = Handle::try_current() else {
            warn!("no runtime available; preview strip left loading");
            return None;
        };
        let frames = Arc::clone(&self.frames);
        debug!(
            generation = token.generation(),
            frame_count = count,
            "refreshing preview strip"
        );
        self.task = Some(handle.spawn(deliver(run, frames)));
        Some(token)
    }

    pub fn cancel(&mut self) {
        self.sampler.cancel();
        self.abort_task();
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PreviewStrip {
    fn drop(&mut self) {
        self.abort_task();
    }
}

async fn deliver(run: SamplerRun, frames: Arc<watch::Sender<PreviewFrames>>) {
    let token = run.token.clone();
    let Some(thumbnails) = run.collect().await else {
        debug!(generation = token.generation(), "discarding superseded thumbnails");
        return;
    };
    if thumbnails.is_empty() {
        debug!(generation = token.generation(), "no thumbnails sampled; strip stays loading");
        return;
    }
    // Token is checked under the channel lock; a newer refresh bumps the
    // generation before it publishes Loading.
    frames.send_if_modified(|state| {
        if !token.is_current() {
            return false;
        }
        *state = PreviewFrames::Ready(thumbnails);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingOpener;
    use crate::timeline::sampler::SamplerConfig;

    fn strip(opener: &RecordingOpener) -> PreviewStrip {
        PreviewStrip::new(FrameSampler::new(
            Arc::new(opener.clone()),
            SamplerConfig::default(),
        ))
    }

    async fn wait_ready(receiver: &mut watch::Receiver<PreviewFrames>) -> Vec<Thumbnail> {
        loop {
            if let PreviewFrames::Ready(thumbnails) = &*receiver.borrow_and_update() {
                return thumbnails.clone();
            }
            receiver.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn refresh_goes_from_loading_to_ready() {
        let opener = RecordingOpener::new(60.0);
        let mut strip = strip(&opener);
        let mut receiver = strip.subscribe();
        assert_eq!(strip.frames(), PreviewFrames::Loading);

        strip
            .refresh("clip.mp4", TimeRange::new(0.0, 8.0).unwrap(), 480.0)
            .unwrap();
        let thumbnails = wait_ready(&mut receiver).await;
        assert_eq!(thumbnails.len(), 4);
        assert_eq!(thumbnails[1].time, 2.0);
    }

    #[tokio::test]
    async fn last_refresh_wins() {
        let opener = RecordingOpener::new(60.0);
        let mut strip = strip(&opener);
        let mut receiver = strip.subscribe();

        let first = strip
            .refresh("clip.mp4", TimeRange::new(0.0, 10.0).unwrap(), 600.0)
            .unwrap();
        let second = strip
            .refresh("clip.mp4", TimeRange::new(30.0, 40.0).unwrap(), 240.0)
            .unwrap();
        assert!(!first.is_current());

        let thumbnails = wait_ready(&mut receiver).await;
        let times: Vec<f64> = thumbnails.iter().map(|thumb| thumb.time).collect();
        assert_eq!(times, vec![30.0, 35.0]);
        assert!(second.is_current());
    }

    #[tokio::test]
    async fn cancel_leaves_strip_loading() {
        let opener = RecordingOpener::new(60.0);
        let mut strip = strip(&opener);
        let token = strip
            .refresh("clip.mp4", TimeRange::new(0.0, 10.0).unwrap(), 600.0)
            .unwrap();
        strip.cancel();
        assert!(!token.is_current());
        tokio::task::yield_now().await;
        assert_eq!(strip.frames(), PreviewFrames::Loading);
        assert_eq!(opener.live(), 0);
    }

    #[tokio::test]
    async fn empty_runs_keep_the_strip_loading() {
        let opener = RecordingOpener::new(60.0);
        let sampler = FrameSampler::new(Arc::new(opener.clone()), SamplerConfig::default());
        let (frames, receiver) = watch::channel(PreviewFrames::Loading);
        let frames = Arc::new(frames);

        let no_slots = sampler.sample("clip.mp4", TimeRange::new(0.0, 10.0).unwrap(), 0);
        deliver(no_slots, Arc::clone(&frames)).await;
        assert_eq!(*receiver.borrow(), PreviewFrames::Loading);

        let unopenable = sampler.sample("", TimeRange::new(0.0, 10.0).unwrap(), 3);
        deliver(unopenable, Arc::clone(&frames)).await;
        assert_eq!(*receiver.borrow(), PreviewFrames::Loading);
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn refresh_without_runtime_stays_loading() {
        let opener = RecordingOpener::new(60.0);
        let mut strip = strip(&opener);
        assert!(
            strip
                .refresh("clip.mp4", TimeRange::new(0.0, 10.0).unwrap(), 600.0)
                .is_none()
        );
        assert_eq!(strip.frames(), PreviewFrames::Loading);
    }
}
