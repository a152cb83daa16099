//! Frame model carried by the queues.
//!
//! Two closed variants, [`VideoFrame`] and [`AudioFrame`], share the
//! [`Frame`] capability: an immutable byte window plus a presentation
//! timestamp. Bounds are checked once, at construction.

pub mod audio;
pub mod codec;
pub mod frame_data;
pub mod video;

pub use audio::AudioFrame;
pub use codec::{AudioCodec, VideoCodec};
pub use frame_data::FrameData;
pub use video::VideoFrame;

/// Common view over a frame variant
pub trait Frame: Send + 'static {
    fn frame_data(&self) -> &FrameData;

    /// Whole backing buffer, including bytes outside the valid window
    fn data(&self) -> &[u8] {
        self.frame_data().buffer()
    }

    fn offset(&self) -> usize {
        self.frame_data().offset()
    }

    fn length(&self) -> usize {
        self.frame_data().length()
    }

    /// Presentation timestamp in milliseconds
    fn timestamp_ms(&self) -> i64 {
        self.frame_data().timestamp_ms()
    }

    fn payload(&self) -> &[u8] {
        self.frame_data().payload()
    }
}
