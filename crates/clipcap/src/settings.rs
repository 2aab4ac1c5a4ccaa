use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::cli::{CliArgs, CliSources};
use crate::timeline::cropper::{DEFAULT_ASPECT_RATIO, DEFAULT_CANVAS_WIDTH};
use crate::timeline::progress::DEFAULT_TICK_INTERVAL;
use crate::timeline::sampler::SamplerConfig;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct FileConfig {
    pub(crate) timeline: Option<TimelineFileConfig>,
    pub(crate) media: Option<MediaFileConfig>,
    pub(crate) preview: Option<PreviewFileConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub(crate) struct TimelineFileConfig {
    pub(crate) thumbnail_width: Option<u32>,
    pub(crate) thumbnail_height: Option<u32>,
    pub(crate) frame_timeout_ms: Option<u64>,
    pub(crate) tick_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub(crate) struct MediaFileConfig {
    pub(crate) backend: Option<String>,
    pub(crate) duration: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub(crate) struct PreviewFileConfig {
    pub(crate) aspect_ratio: Option<f64>,
    pub(crate) canvas_width: Option<u32>,
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub timeline: TimelineSettings,
    pub media: MediaSettings,
    pub preview: PreviewSettings,
}

#[derive(Debug)]
pub struct ResolvedSettings {
    pub settings: EffectiveSettings,
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TimelineSettings {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub frame_timeout: Duration,
    pub tick_interval: Duration,
}

impl TimelineSettings {
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            thumbnail_width: self.thumbnail_width,
            thumbnail_height: self.thumbnail_height,
            frame_timeout: self.frame_timeout,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaSettings {
    pub backend: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub aspect_ratio: f64,
    pub canvas_width: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "failed to parse config file {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "config file {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
        }
    }
}

pub fn resolve_settings(
    cli: &CliArgs,
    sources: &CliSources,
) -> Result<ResolvedSettings, ConfigError> {
    let (file, config_path) = load_config(cli.config.as_deref())?;
    merge(cli, sources, file, config_path)
}

fn load_config(path_override: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = path_override {
        let path = path.to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let config = load_file_config(&path)?;
        return Ok((config, Some(path)));
    }

    if let Some(project_path) = project_config_path()
        && project_path.exists()
    {
        let config = load_file_config(&project_path)?;
        return Ok((config, Some(project_path)));
    }

    let Some(default_path) = default_config_path() else {
        return Ok((FileConfig::default(), None));
    };
    if !default_path.exists() {
        return Ok((FileConfig::default(), None));
    }
    let config = load_file_config(&default_path)?;
    Ok((config, Some(default_path)))
}

fn merge(
    cli: &CliArgs,
    sources: &CliSources,
    file: FileConfig,
    config_path: Option<PathBuf>,
) -> Result<ResolvedSettings, ConfigError> {
    let FileConfig {
        timeline: file_timeline,
        media: file_media,
        preview: file_preview,
    } = file;

    let timeline_cfg = file_timeline.unwrap_or_default();
    let media_cfg = file_media.unwrap_or_default();
    let preview_cfg = file_preview.unwrap_or_default();
    let path = config_path.as_ref();

    let thumbnail_width = resolve_positive_u32(
        cli.thumbnail_width,
        timeline_cfg.thumbnail_width,
        !sources.thumbnail_width_from_cli,
        "thumbnail_width",
        path,
    )?;
    let thumbnail_height = resolve_positive_u32(
        cli.thumbnail_height,
        timeline_cfg.thumbnail_height,
        !sources.thumbnail_height_from_cli,
        "thumbnail_height",
        path,
    )?;
    let frame_timeout_ms = resolve_positive_u64(
        cli.frame_timeout_ms,
        timeline_cfg.frame_timeout_ms,
        !sources.frame_timeout_from_cli,
        "frame_timeout_ms",
        path,
    )?;
    let tick_interval_ms = resolve_positive_u64(
        DEFAULT_TICK_INTERVAL.as_millis() as u64,
        timeline_cfg.tick_interval_ms,
        true,
        "tick_interval_ms",
        path,
    )?;

    let duration = match media_cfg.duration {
        Some(value) => Some(positive_f64(value, "duration", path)?),
        None => None,
    };
    let media = MediaSettings {
        backend: normalize_string(cli.backend.clone())
            .or_else(|| normalize_string(media_cfg.backend)),
        duration,
    };

    let aspect_ratio = match preview_cfg.aspect_ratio {
        Some(value) => positive_f64(value, "aspect_ratio", path)?,
        None => DEFAULT_ASPECT_RATIO,
    };
    let canvas_width = resolve_positive_u32(
        DEFAULT_CANVAS_WIDTH,
        preview_cfg.canvas_width,
        true,
        "canvas_width",
        path,
    )?;

    let settings = EffectiveSettings {
        timeline: TimelineSettings {
            thumbnail_width,
            thumbnail_height,
            frame_timeout: Duration::from_millis(frame_timeout_ms),
            tick_interval: Duration::from_millis(tick_interval_ms),
        },
        media,
        preview: PreviewSettings {
            aspect_ratio,
            canvas_width,
        },
    };

    Ok(ResolvedSettings {
        settings,
        config_path,
    })
}

pub(crate) fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "clipcap", "clipcap").map(|dirs| dirs.config_dir().join("config.toml"))
}

pub(crate) fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join("clipcap.toml"))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn resolve_positive_u32(
    cli_value: u32,
    file_value: Option<u32>,
    use_file: bool,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<u32, ConfigError> {
    if use_file && let Some(value) = file_value {
        if value < 1 {
            return Err(ConfigError::InvalidValue {
                path: config_path.cloned(),
                field,
                value: value.to_string(),
            });
        }
        return Ok(value);
    }
    Ok(cli_value)
}

fn resolve_positive_u64(
    cli_value: u64,
    file_value: Option<u64>,
    use_file: bool,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<u64, ConfigError> {
    if use_file && let Some(value) = file_value {
        if value < 1 {
            return Err(ConfigError::InvalidValue {
                path: config_path.cloned(),
                field,
                value: value.to_string(),
            });
        }
        return Ok(value);
    }
    Ok(cli_value)
}

fn positive_f64(
    value: f64,
    field: &'static str,
    config_path: Option<&PathBuf>,
) -> Result<f64, ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::InvalidValue {
            path: config_path.cloned(),
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}
