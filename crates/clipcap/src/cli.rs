use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};

use crate::timeline::mapping::MAX_CONTAINER_WIDTH;
use crate::timeline::sampler::{DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH};

pub const DEFAULT_CONTAINER_WIDTH: f64 = 960.0;
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Default)]
pub struct CliSources {
    pub thumbnail_width_from_cli: bool,
    pub thumbnail_height_from_cli: bool,
    pub frame_timeout_from_cli: bool,
}

impl CliSources {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            thumbnail_width_from_cli: value_from_cli(matches, "thumbnail_width"),
            thumbnail_height_from_cli: value_from_cli(matches, "thumbnail_height"),
            frame_timeout_from_cli: value_from_cli(matches, "frame_timeout_ms"),
        }
    }
}

fn value_from_cli(matches: &ArgMatches, id: &str) -> bool {
    matches
        .value_source(id)
        .is_some_and(|source| matches!(source, ValueSource::CommandLine))
}

pub fn parse_cli() -> (CliArgs, CliSources) {
    let command = CliArgs::command();
    let matches = command.get_matches();
    let args = match CliArgs::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };
    let sources = CliSources::from_matches(&matches);
    (args, sources)
}

#[derive(Debug, Parser)]
#[command(
    name = "clipcap",
    about = "Sample timeline thumbnails and play back a trimmed range",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Lock media decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Override the configuration file path
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print the list of available media backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Range start in source seconds
    #[arg(long = "start", default_value_t = 0.0, value_parser = parse_seconds)]
    pub start: f64,

    /// Range end in source seconds (defaults to the source duration)
    #[arg(long = "end", value_parser = parse_seconds)]
    pub end: Option<f64>,

    /// Width of the thumbnail strip in pixels
    #[arg(
        long = "container-width",
        default_value_t = DEFAULT_CONTAINER_WIDTH,
        value_parser = parse_container_width
    )]
    pub container_width: f64,

    /// Thumbnail width in pixels
    #[arg(
        long = "thumbnail-width",
        id = "thumbnail_width",
        default_value_t = DEFAULT_THUMBNAIL_WIDTH,
        value_parser = parse_positive_u32
    )]
    pub thumbnail_width: u32,

    /// Thumbnail height in pixels
    #[arg(
        long = "thumbnail-height",
        id = "thumbnail_height",
        default_value_t = DEFAULT_THUMBNAIL_HEIGHT,
        value_parser = parse_positive_u32
    )]
    pub thumbnail_height: u32,

    /// Milliseconds to wait for a seeked frame before giving up on a slot
    #[arg(
        long = "frame-timeout-ms",
        id = "frame_timeout_ms",
        default_value_t = DEFAULT_FRAME_TIMEOUT_MS,
        value_parser = parse_positive_u64
    )]
    pub frame_timeout_ms: u64,

    /// Write the thumbnail manifest (JSON) to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Play the range once through an editor session
    #[arg(long = "play")]
    pub play: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Input media URL or path
    pub input: Option<String>,
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if parsed == 0 {
        return Err("value must be at least 1".into());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if parsed == 0 {
        return Err("value must be at least 1".into());
    }
    Ok(parsed)
}

fn parse_container_width(value: &str) -> Result<f64, String> {
    let parsed = value
        .parse::<f64>()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if !(parsed.is_finite() && parsed > 0.0) {
        return Err("value must be greater than zero".into());
    }
    if parsed > MAX_CONTAINER_WIDTH {
        return Err(format!("value must be at most {MAX_CONTAINER_WIDTH}"));
    }
    Ok(parsed)
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let parsed = value
        .parse::<f64>()
        .map_err(|_| format!("'{value}' is not a valid number of seconds"))?;
    if !(parsed.is_finite() && parsed >= 0.0) {
        return Err("seconds must be a non-negative number".into());
    }
    Ok(parsed)
}
