use std::sync::Arc;

use crate::error::{FrameQueueError, Result};

/// Byte window shared by every frame variant.
///
/// The buffer is reference counted and never mutated, so cloning a frame
/// (e.g. when a queue is copied) does not copy the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameData {
    buffer: Arc<[u8]>,
    offset: usize,
    length: usize,
    timestamp_ms: i64,
}

impl FrameData {
    /// Validates `offset + length <= buffer.len()`
    pub fn new(
        buffer: impl Into<Arc<[u8]>>,
        offset: usize,
        length: usize,
        timestamp_ms: i64,
    ) -> Result<Self> {
        let buffer = buffer.into();
        let in_bounds = offset
            .checked_add(length)
            .map_or(false, |end| end <= buffer.len());

        if !in_bounds {
            return Err(FrameQueueError::InvalidFrame {
                offset,
                length,
                buffer_len: buffer.len(),
            });
        }

        Ok(Self {
            buffer,
            offset,
            length,
            timestamp_ms,
        })
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Valid bytes only (`buffer[offset..offset + length]`)
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }
}
