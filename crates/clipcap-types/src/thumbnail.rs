use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum ThumbnailImage {
    /// `data:image/png;base64,...`
    DataUri(String),
    /// The decoder never presented the frame for this slot.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub index: usize,
    pub time: f64,
    pub image: ThumbnailImage,
}

impl Thumbnail {
    pub fn captured(index: usize, time: f64, data_uri: String) -> Self {
        Self {
            index,
            time,
            image: ThumbnailImage::DataUri(data_uri),
        }
    }

    pub fn unavailable(index: usize, time: f64) -> Self {
        Self {
            index,
            time,
            image: ThumbnailImage::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.image, ThumbnailImage::DataUri(_))
    }
}
