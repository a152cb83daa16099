use std::sync::Arc;

use super::codec::AudioCodec;
use super::frame_data::FrameData;
use super::Frame;
use crate::error::Result;

/// Encoded audio frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    codec: AudioCodec,
    data: FrameData,
}

impl AudioFrame {
    pub fn new(
        codec: AudioCodec,
        buffer: impl Into<Arc<[u8]>>,
        offset: usize,
        length: usize,
        timestamp_ms: i64,
    ) -> Result<Self> {
        Ok(Self {
            codec,
            data: FrameData::new(buffer, offset, length, timestamp_ms)?,
        })
    }

    pub fn codec(&self) -> AudioCodec {
        self.codec
    }
}

impl Frame for AudioFrame {
    fn frame_data(&self) -> &FrameData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_preserved() {
        let frame = AudioFrame::new(AudioCodec::AacLc, vec![0xffu8, 0xf1, 0x50, 0x80], 2, 2, 23).unwrap();
        assert_eq!(frame.codec(), AudioCodec::AacLc);
        assert_eq!(frame.offset(), 2);
        assert_eq!(frame.length(), 2);
        assert_eq!(frame.timestamp_ms(), 23);
        assert_eq!(frame.payload(), &[0x50, 0x80]);
    }

    #[test]
    fn test_invalid_window() {
        assert!(AudioFrame::new(AudioCodec::Unknown, vec![0u8; 2], 1, 2, 0).is_err());
    }
}
