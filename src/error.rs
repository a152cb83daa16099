use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrameQueueError>;

/// Errors raised while building queues, frames or configuration.
///
/// Full and empty queues are never errors; they show up as `false` / `None`.
#[derive(Debug, Error)]
pub enum FrameQueueError {
    /// Invalid queue configuration (zero capacity, unparsable value, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Offset/length window does not fit inside the frame buffer
    #[error("invalid frame: offset {offset} + length {length} exceeds buffer of {buffer_len} bytes")]
    InvalidFrame {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
