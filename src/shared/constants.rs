pub const APP_NAME: &str = "frame-queue";

pub const CONFIG_FILE: &str = "frame-queue.config";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

/// Push waits are short: a full queue means the consumer is behind
pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 5;
/// Pop waits are long: an empty queue is the consumer's normal idle state
pub const DEFAULT_POP_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_CAPACITY: usize = 60;

/// Upper bound on a single condvar wait while a cancellation token is attached
pub const CANCEL_POLL_INTERVAL_MS: u64 = 10;

pub const DEFAULT_SIM_FPS: u32 = 30;
pub const DEFAULT_SIM_FRAMES: u64 = 300;
pub const DEFAULT_SIM_PAYLOAD_BYTES: usize = 4096;
pub const DEFAULT_KEYFRAME_INTERVAL: u64 = 30;
