use std::sync::Arc;

use super::codec::VideoCodec;
use super::frame_data::FrameData;
use super::Frame;
use crate::error::Result;

/// Encoded video frame as produced by a depacketizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    codec: VideoCodec,
    is_keyframe: bool,
    data: FrameData,
    /// Capture (receive) time, when the capture pipeline supplies one
    captured_timestamp_ms: Option<i64>,
}

impl VideoFrame {
    /// Creates a new video frame
    ///
    /// # Errors
    /// `FrameQueueError::InvalidFrame` if `offset + length` exceeds the buffer.
    pub fn new(
        codec: VideoCodec,
        is_keyframe: bool,
        buffer: impl Into<Arc<[u8]>>,
        offset: usize,
        length: usize,
        timestamp_ms: i64,
    ) -> Result<Self> {
        Ok(Self {
            codec,
            is_keyframe,
            data: FrameData::new(buffer, offset, length, timestamp_ms)?,
            captured_timestamp_ms: None,
        })
    }

    pub fn with_captured_timestamp(mut self, captured_timestamp_ms: i64) -> Self {
        self.captured_timestamp_ms = Some(captured_timestamp_ms);
        self
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    pub fn is_keyframe(&self) -> bool {
        self.is_keyframe
    }

    pub fn captured_timestamp_ms(&self) -> Option<i64> {
        self.captured_timestamp_ms
    }
}

impl Frame for VideoFrame {
    fn frame_data(&self) -> &FrameData {
        &self.data
    }
}
