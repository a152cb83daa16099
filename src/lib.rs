//! Bounded, timeout-aware frame handoff between a demuxer thread and a
//! decoder thread of a streaming client.
//!
//! ```
//! use frame_queue::{VideoCodec, VideoFrame, VideoFrameQueue};
//! use std::time::Duration;
//!
//! let queue = VideoFrameQueue::new(2).unwrap();
//! let frame = VideoFrame::new(VideoCodec::H264, true, vec![0u8, 0, 0, 1, 0x65], 4, 1, 0).unwrap();
//!
//! assert!(queue.push(frame.clone()));
//! assert_eq!(queue.pop_timeout(Duration::from_millis(5)), Some(frame));
//! ```

pub mod core;
pub mod error;
pub mod frame;
pub mod shared;
pub mod utils;

pub use crate::core::{
    AudioFrameQueue, CancellationToken, FrameQueue, QueueConfig, QueueEvent, QueueObserver,
    QueueStats, VideoFrameQueue,
};
pub use error::{FrameQueueError, Result};
pub use frame::{AudioCodec, AudioFrame, Frame, VideoCodec, VideoFrame};
