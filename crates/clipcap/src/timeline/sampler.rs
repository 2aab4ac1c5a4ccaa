use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clipcap_media::raster;
use clipcap_media::{DynMediaOpener, MediaSource, OpenOptions, VideoFrame};
use clipcap_types::{Thumbnail, TimeRange};
use futures_util::{StreamExt, stream};
use tracing::{debug, warn};

use super::StreamBundle;
use super::mapping::sample_time;

pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 120;
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 90;
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub frame_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            thumbnail_height: DEFAULT_THUMBNAIL_HEIGHT,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}

/// Identifies one collection run. A run stays current until the sampler
/// starts (or cancels) another one.
#[derive(Debug, Clone)]
pub struct RunToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl RunToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }
}

pub struct SamplerRun {
    pub token: RunToken,
    pub bundle: StreamBundle<Thumbnail>,
}

impl SamplerRun {
    pub async fn collect(self) -> Option<Vec<Thumbnail>> {
        let SamplerRun { token, bundle } = self;
        let thumbnails: Vec<Thumbnail> = bundle.stream.collect().await;
        token.is_current().then_some(thumbnails)
    }
}

/// Captures evenly spaced thumbnails from an independent, muted media
/// instance. Every call to [`FrameSampler::sample`] invalidates the runs
/// before it.
#[derive(Clone)]
pub struct FrameSampler {
    opener: DynMediaOpener,
    config: SamplerConfig,
    latest: Arc<AtomicU64>,
}

impl FrameSampler {
    pub fn new(opener: DynMediaOpener, config: SamplerConfig) -> Self {
        Self {
            opener,
            config,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }

    pub fn sample(&self, url: &str, range: TimeRange, frame_count: usize) -> SamplerRun {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let token = RunToken {
            generation,
            latest: Arc::clone(&self.latest),
        };

        if frame_count == 0 || range.is_degenerate() {
            debug!(
                frame_count,
                start = range.start,
                end = range.end,
                "nothing to sample"
            );
            return SamplerRun {
                token,
                bundle: StreamBundle::new(Box::pin(stream::empty()), 0),
            };
        }

        let cursor = SampleCursor {
            opener: Arc::clone(&self.opener),
            config: self.config,
            url: url.to_owned(),
            range,
            frame_count,
            next_index: 0,
            decoder: None,
            token: token.clone(),
        };
        let stream = stream::unfold(cursor, |mut cursor| async move {
            let thumbnail = cursor.next_thumbnail().await?;
            Some((thumbnail, cursor))
        });

        SamplerRun {
            token,
            bundle: StreamBundle::new(Box::pin(stream), frame_count),
        }
    }
}

struct SampleCursor {
    opener: DynMediaOpener,
    config: SamplerConfig,
    url: String,
    range: TimeRange,
    frame_count: usize,
    next_index: usize,
    decoder: Option<Box<dyn MediaSource>>,
    token: RunToken,
}

impl SampleCursor {
    async fn next_thumbnail(&mut self) -> Option<Thumbnail> {
        loop {
            if !self.token.is_current() {
                debug!(generation = self.token.generation(), "sampling run superseded");
                self.release();
                return None;
            }
            if self.next_index >= self.frame_count {
                self.release();
                return None;
            }
            if self.decoder.is_none() {
                match self
                    .opener
                    .open(&self.url, OpenOptions::sampling(self.range.start))
                {
                    Ok(decoder) => self.decoder = Some(decoder),
                    Err(err) => {
                        warn!(url = %self.url, error = %err, "failed to open sampling decoder");
                        return None;
                    }
                }
            }

            let index = self.next_index;
            self.next_index += 1;
            let time = sample_time(&self.range, index, self.frame_count);

            let ready = {
                let decoder = self.decoder.as_mut()?;
                // The instance was opened at the first slot's time already.
                if index > 0 {
                    decoder.seek(time);
                }
                decoder.request_frame()
            };
            let presented = matches!(
                tokio::time::timeout(self.config.frame_timeout, ready).await,
                Ok(Ok(()))
            );

            if !self.token.is_current() {
                debug!(generation = self.token.generation(), "sampling run superseded");
                self.release();
                return None;
            }
            if !presented {
                warn!(index, time, "frame not presented in time; slot left unavailable");
                return Some(Thumbnail::unavailable(index, time));
            }

            let frame = self
                .decoder
                .as_ref()
                .and_then(|decoder| decoder.current_frame());
            match frame.and_then(|frame| capture(&frame, &self.config)) {
                Some(uri) => return Some(Thumbnail::captured(index, time, uri)),
                None => {
                    warn!(index, time, "could not rasterize frame; skipping slot");
                    continue;
                }
            }
        }
    }

    fn release(&mut self) {
        if self.decoder.take().is_some() {
            debug!(url = %self.url, "released sampling decoder");
        }
    }
}

fn capture(frame: &VideoFrame, config: &SamplerConfig) -> Option<String> {
    let scaled = raster::stretch(frame, config.thumbnail_width, config.thumbnail_height)?;
    match raster::encode_data_uri(&scaled) {
        Ok(uri) => Some(uri),
        Err(err) => {
            warn!(error = %err, "failed to encode thumbnail");
            None
        }
    }
}
