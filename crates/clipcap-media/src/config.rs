use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clipcap_types::{MediaError, MediaResult};

use crate::backends::synthetic::{SyntheticOpener, SyntheticOptions};
use crate::core::DynMediaOpener;

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 360;
const DEFAULT_DURATION_SECS: f64 = 60.0;
const DEFAULT_CLOCK_TICK: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Synthetic,
}

impl FromStr for Backend {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Backend::Synthetic),
            other => Err(MediaError::configuration(format!(
                "unknown media backend '{other}'"
            ))),
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub backend: Backend,
    pub frame_width: u32,
    pub frame_height: u32,
    pub duration: f64,
    pub clock_tick: Option<Duration>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            backend: Backend::Synthetic,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            duration: DEFAULT_DURATION_SECS,
            clock_tick: Some(DEFAULT_CLOCK_TICK),
        }
    }
}

impl Configuration {
    pub fn from_env() -> MediaResult<Self> {
        let mut config = Configuration::default();
        if let Ok(backend) = env::var("CLIPCAP_BACKEND") {
            config.backend = Backend::from_str(&backend)?;
        }
        if let Ok(duration) = env::var("CLIPCAP_SOURCE_DURATION") {
            config.duration = parse_duration(&duration)?;
        }
        Ok(config)
    }

    pub fn available_backends() -> Vec<Backend> {
        vec![Backend::Synthetic]
    }

    pub fn create_opener(&self) -> MediaResult<DynMediaOpener> {
        self.validate()?;
        match self.backend {
            Backend::Synthetic => Ok(Arc::new(SyntheticOpener::new(SyntheticOptions {
                width: self.frame_width,
                height: self.frame_height,
                duration: self.duration,
                clock_tick: self.clock_tick,
            }))),
        }
    }

    fn validate(&self) -> MediaResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(MediaError::configuration(format!(
                "frame size {}x{} must be non-zero",
                self.frame_width, self.frame_height
            )));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(MediaError::configuration(format!(
                "source duration {} must be a positive number of seconds",
                self.duration
            )));
        }
        Ok(())
    }
}

fn parse_duration(value: &str) -> MediaResult<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| {
        MediaError::configuration(format!(
            "failed to parse CLIPCAP_SOURCE_DURATION='{value}' as seconds"
        ))
    })?;
    if !(parsed.is_finite() && parsed > 0.0) {
        return Err(MediaError::configuration(
            "CLIPCAP_SOURCE_DURATION must be greater than zero",
        ));
    }
    Ok(parsed)
}
