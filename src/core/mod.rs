pub mod cancel;
pub mod config;
pub mod frame_queue;
pub mod observer;
pub mod pipeline;

pub use cancel::CancellationToken;
pub use config::QueueConfig;
pub use frame_queue::{AudioFrameQueue, FrameQueue, VideoFrameQueue};
pub use observer::{
    ChannelObserver, FanOut, LogObserver, QueueEvent, QueueObserver, QueueOp, QueueStats,
    QueueStatsSnapshot,
};
