//! Media source capability consumed by the timeline engine, plus the
//! backends and raster helpers that back it.

pub mod backends;
pub mod config;
pub mod core;
pub mod raster;
pub mod slot;

pub use crate::config::{Backend, Configuration};
pub use crate::core::{
    DynMediaOpener, FrameReady, MediaEvent, MediaEvents, MediaOpener, MediaSource, OpenOptions,
};
pub use crate::slot::MediaSlot;
pub use clipcap_types::{MediaError, MediaResult, VideoFrame};
