use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clipcap_media::{
    Backend, Configuration, DynMediaOpener, MediaError, MediaEvent, MediaResult, OpenOptions,
};
use clipcap_types::{Thumbnail, TimeRange};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::editor::{EditorConfig, EditorSession};
use crate::settings::EffectiveSettings;
use crate::timeline::mapping::frame_count;
use crate::timeline::{FrameSampler, PreviewCropper};

pub struct ExecutionPlan {
    pub config: Configuration,
    pub settings: EffectiveSettings,
    pub input: String,
    pub start: f64,
    pub end: Option<f64>,
    pub container_width: f64,
    pub output: Option<PathBuf>,
    pub play: bool,
}

#[derive(Debug, Serialize)]
pub struct ThumbnailManifest<'a> {
    pub source: &'a str,
    pub range: TimeRange,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub thumbnails: &'a [Thumbnail],
}

pub fn display_available_backends() {
    let names: Vec<&str> = Configuration::available_backends()
        .iter()
        .map(Backend::as_str)
        .collect();
    println!("available backends: {}", names.join(", "));
}

pub fn parse_backend(name: &str) -> MediaResult<Backend> {
    Backend::from_str(name)
}

pub async fn run(plan: ExecutionPlan) -> MediaResult<()> {
    let opener = plan.config.create_opener()?;
    let range = resolve_range(plan.start, plan.end, plan.config.duration)?;
    info!(
        input = %plan.input,
        backend = %plan.config.backend,
        start = range.start,
        end = range.end,
        "sampling timeline"
    );

    let sampler = FrameSampler::new(
        opener.clone(),
        plan.settings.timeline.sampler_config(),
    );
    let thumbnails = sample_strip(&sampler, &plan.input, range, plan.container_width).await;
    let available = thumbnails.iter().filter(|thumb| thumb.is_available()).count();
    info!(
        captured = available,
        unavailable = thumbnails.len() - available,
        "timeline sampled"
    );

    if let Some(path) = plan.output.as_deref() {
        let manifest = ThumbnailManifest {
            source: &plan.input,
            range,
            thumbnail_width: plan.settings.timeline.thumbnail_width,
            thumbnail_height: plan.settings.timeline.thumbnail_height,
            thumbnails: &thumbnails,
        };
        write_manifest(path, &manifest)?;
        info!(path = %path.display(), "manifest written");
    }

    if plan.play {
        play_range(&opener, sampler, &plan, range).await?;
    }
    Ok(())
}

pub fn resolve_range(start: f64, end: Option<f64>, duration: f64) -> MediaResult<TimeRange> {
    let end = end.unwrap_or(duration);
    if end > duration {
        warn!(end, duration, "range end is past the source duration");
    }
    TimeRange::new(start, end).map_err(|err| MediaError::configuration(err.to_string()))
}

async fn sample_strip(
    sampler: &FrameSampler,
    input: &str,
    range: TimeRange,
    container_width: f64,
) -> Vec<Thumbnail> {
    let count = frame_count(container_width, sampler.config().thumbnail_width);
    let mut run = sampler.sample(input, range, count);
    let progress = indicatif::ProgressBar::new(run.bundle.total_frames as u64);
    progress.set_style(sampling_bar_style());

    let mut thumbnails = Vec::new();
    while let Some(thumbnail) = run.bundle.stream.next().await {
        progress.inc(1);
        thumbnails.push(thumbnail);
    }
    progress.finish_and_clear();
    thumbnails
}

pub fn write_manifest(path: &Path, manifest: &ThumbnailManifest<'_>) -> MediaResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), manifest)
        .map_err(|err| MediaError::encode(err.to_string()))
}

async fn play_range(
    opener: &DynMediaOpener,
    sampler: FrameSampler,
    plan: &ExecutionPlan,
    range: TimeRange,
) -> MediaResult<()> {
    let timeline = &plan.settings.timeline;
    let source = opener.open(&plan.input, OpenOptions::primary(range.start))?;
    let mut session = EditorSession::new(
        range,
        sampler,
        EditorConfig {
            tick_interval: timeline.tick_interval,
            container_width: plan.container_width,
        },
    );
    session.attach_media(plan.input.clone(), source);
    let media = session.media().clone();
    let Some(mut events) = media.with(|media| media.subscribe()) else {
        return Ok(());
    };

    let preview = &plan.settings.preview;
    let cropper = PreviewCropper::new(preview.aspect_ratio, preview.canvas_width)
        .map(|cropper| cropper.mount(media.clone(), timeline.tick_interval));
    if cropper.is_none() {
        warn!(
            aspect_ratio = preview.aspect_ratio,
            canvas_width = preview.canvas_width,
            "preview canvas disabled"
        );
    }

    let mut indicator = WatchStream::new(session.indicator());
    let bar = indicatif::ProgressBar::new(100);
    bar.set_style(playback_bar_style());

    session.toggle_playback();
    let (handle, task) = session.spawn();
    loop {
        tokio::select! {
            Some(state) = indicator.next() => {
                bar.set_position(state.fraction.clamp(0.0, 100.0).round() as u64);
            }
            event = events.recv() => match event {
                Ok(MediaEvent::Pause) | Err(RecvError::Closed) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "playback events lagged"),
            },
        }
    }
    bar.finish_and_clear();

    if let Some(frame) = cropper.as_ref().and_then(|mounted| mounted.latest()) {
        info!(
            width = frame.width(),
            height = frame.height(),
            "last preview frame rendered"
        );
    }
    handle.shutdown();
    let session = task
        .await
        .map_err(|err| MediaError::configuration(format!("editor task failed: {err}")))?;
    info!(
        position = session.media().position().unwrap_or(range.start),
        "playback finished"
    );
    Ok(())
}

fn sampling_bar_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
        .progress_chars("##-")
}

fn playback_bar_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template("[{elapsed_precise}] {bar:40.green/white} {pos}%")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
        .progress_chars("=>-")
}
