//! Error taxonomy for the crop session and pipeline.
//!
//! - `SourceRead`: the source stream cannot be opened or decoded; ends the session
//! - `RegionOutOfBounds`: the committed rectangle does not fit the source; never clamped
//! - `OutOfMemory`: a pixel buffer did not fit; recovered, the session stays editable
//! - `SinkWrite`: encoding or writing the output failed; the in-memory result stands
//! - `JobPanicked`: the crop job panicked on the dispatcher; reported like any other failure
//!
//! A second commit while one is in flight is not an error (see `CommitStatus`).

use thiserror::Error;

use crate::decode::DecodeError;
use crate::geometry::IntRect;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Failed to read source image: {0}")]
    SourceRead(#[source] DecodeError),

    #[error("Rectangle {rect} is outside of the image ({width},{height},{rotation})")]
    RegionOutOfBounds {
        rect: IntRect,
        width: u32,
        height: u32,
        rotation: i32,
    },

    #[error("Out of memory: {requested} bytes requested")]
    OutOfMemory { requested: usize },

    #[error("Failed to write output: {0}")]
    SinkWrite(String),

    #[error("Invalid rotation: {0} degrees (must be a multiple of 90)")]
    InvalidRotation(i32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Crop job panicked: {0}")]
    JobPanicked(String),
}

impl CropError {
    /// Errors that end the session instead of allowing another commit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CropError::SourceRead(_))
    }
}

impl From<DecodeError> for CropError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::OutOfMemory { bytes } => CropError::OutOfMemory { requested: bytes },
            other => CropError::SourceRead(other),
        }
    }
}
