// THEORY:
// Numeric degeneracies inside a frame (empty candidate sets, zero weights, zero slopes) are never
// errors: they collapse to "no estimate" and the tracker carries the last good line forward. What
// remains for `LaneError` is the small set of failures that cannot be recovered locally: a bad
// deployment profile, I/O around that profile or a still image, and a stream that was driven out
// of frame order or has already shut down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaneError {
    #[error("invalid deployment profile: {0}")]
    InvalidProfile(String),

    #[error("failed to read deployment profile: {0}")]
    ProfileIo(#[from] std::io::Error),

    #[error("failed to parse deployment profile: {0}")]
    ProfileParse(#[from] serde_yaml::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The tracker was asked to advance with a frame that is not the next one in sequence.
    #[error("frame {got} arrived out of order (expected frame {expected})")]
    OutOfOrderFrame { expected: u64, got: u64 },

    #[error("stream {0} is closed")]
    StreamClosed(u64),

    #[error("stream pool is full ({0} streams open)")]
    PoolFull(usize),
}

pub type Result<T> = std::result::Result<T, LaneError>;
