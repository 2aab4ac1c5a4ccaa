//! Shared data model for the caption trim editor crates.

mod caption;
mod error;
mod frame;
mod range;
mod thumbnail;

pub use caption::Caption;
pub use error::{MediaError, MediaResult};
pub use frame::VideoFrame;
pub use range::{RangeError, TimeRange};
pub use thumbnail::{Thumbnail, ThumbnailImage};
