use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bounded playback window in absolute source seconds.
///
/// Fields are public so that hosts can hand over whatever the trim handles
/// produced; consumers call [`TimeRange::is_degenerate`] before dividing by
/// [`TimeRange::duration`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeError {
    #[error("range bounds must be finite (start={start}, end={end})")]
    NonFinite { start: f64, end: f64 },
    #[error("range start {start} is negative")]
    NegativeStart { start: f64 },
    #[error("range end {end} must be greater than start {start}")]
    Empty { start: f64, end: f64 },
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self, RangeError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(RangeError::NonFinite { start, end });
        }
        if start < 0.0 {
            return Err(RangeError::NegativeStart { start });
        }
        if end <= start {
            return Err(RangeError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.start.is_finite() && self.end.is_finite() && self.end > self.start)
    }
}
