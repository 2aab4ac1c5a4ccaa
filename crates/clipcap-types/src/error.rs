use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("failed to open media '{url}': {message}")]
    Open { url: String, message: String },
    #[error("failed to encode frame: {message}")]
    Encode { message: String },
    #[error("invalid frame: {message}")]
    InvalidFrame { message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MediaError::Configuration {
            message: message.into(),
        }
    }

    pub fn open(url: impl Into<String>, message: impl Into<String>) -> Self {
        MediaError::Open {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        MediaError::Encode {
            message: message.into(),
        }
    }
}
