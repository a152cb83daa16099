//! Backpressure visibility for [`FrameQueue`](super::frame_queue::FrameQueue).
//!
//! Observers are optional and are invoked after the queue lock is released,
//! so a slow observer delays only the thread that triggered the event.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use serde::Serialize;

use crate::utils::logger::{self, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOp {
    Push,
    Pop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// Frame rejected because the queue stayed full for the whole timeout
    PushTimedOut { len: usize, capacity: usize },
    /// No frame arrived within the pop timeout
    PopTimedOut,
    /// A blocked push or pop gave up because its token was cancelled
    Cancelled { op: QueueOp },
    /// `copy_into` found too little room in the destination
    CopyOverflow { dropped: usize },
}

impl fmt::Display for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueEvent::PushTimedOut { len, capacity } => {
                write!(f, "Cannot add frame, queue is full ({}/{})", len, capacity)
            }
            QueueEvent::PopTimedOut => write!(f, "Cannot get frame, queue is empty"),
            QueueEvent::Cancelled { op: QueueOp::Push } => write!(f, "Push cancelled"),
            QueueEvent::Cancelled { op: QueueOp::Pop } => write!(f, "Pop cancelled"),
            QueueEvent::CopyOverflow { dropped } => {
                write!(f, "Queue copy dropped {} frames, destination is full", dropped)
            }
        }
    }
}

pub trait QueueObserver: Send + Sync {
    fn on_event(&self, event: QueueEvent);
}

/// Lock-free event counters
#[derive(Debug, Default)]
pub struct QueueStats {
    push_drops: AtomicU64,
    pop_timeouts: AtomicU64,
    cancellations: AtomicU64,
    copy_overflow_drops: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    pub push_drops: u64,
    pub pop_timeouts: u64,
    pub cancellations: u64,
    pub copy_overflow_drops: u64,
}

impl QueueStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            push_drops: self.push_drops.load(Ordering::Relaxed),
            pop_timeouts: self.pop_timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            copy_overflow_drops: self.copy_overflow_drops.load(Ordering::Relaxed),
        }
    }
}

impl QueueObserver for QueueStats {
    fn on_event(&self, event: QueueEvent) {
        match event {
            QueueEvent::PushTimedOut { .. } => {
                self.push_drops.fetch_add(1, Ordering::Relaxed);
            }
            QueueEvent::PopTimedOut => {
                self.pop_timeouts.fetch_add(1, Ordering::Relaxed);
            }
            QueueEvent::Cancelled { .. } => {
                self.cancellations.fetch_add(1, Ordering::Relaxed);
            }
            QueueEvent::CopyOverflow { dropped } => {
                self.copy_overflow_drops
                    .fetch_add(dropped as u64, Ordering::Relaxed);
            }
        }
    }
}

/// Writes events to the file logger under a queue label
pub struct LogObserver {
    label: String,
}

impl LogObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl QueueObserver for LogObserver {
    fn on_event(&self, event: QueueEvent) {
        let level = match event {
            QueueEvent::PushTimedOut { .. } | QueueEvent::CopyOverflow { .. } => LogLevel::Warn,
            QueueEvent::PopTimedOut | QueueEvent::Cancelled { .. } => LogLevel::Debug,
        };
        // Pop timeouts fire on every idle poll; skip the format when filtered.
        if logger::is_enabled(level) {
            logger::log(level, &format!("[{}] {}", self.label, event));
        }
    }
}

/// Forwards events to a channel without ever blocking the queue.
///
/// Events are discarded when the channel is full or disconnected.
pub struct ChannelObserver {
    sender: Sender<QueueEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<QueueEvent>) -> Self {
        Self { sender }
    }
}

impl QueueObserver for ChannelObserver {
    fn on_event(&self, event: QueueEvent) {
        let _ = self.sender.try_send(event);
    }
}

/// Dispatches every event to each inner observer in order
#[derive(Default)]
pub struct FanOut {
    observers: Vec<Arc<dyn QueueObserver>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl QueueObserver for FanOut {
    fn on_event(&self, event: QueueEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counts_events() {
        let stats = QueueStats::new();
        stats.on_event(QueueEvent::PushTimedOut { len: 2, capacity: 2 });
        stats.on_event(QueueEvent::PushTimedOut { len: 2, capacity: 2 });
        stats.on_event(QueueEvent::PopTimedOut);
        stats.on_event(QueueEvent::Cancelled { op: QueueOp::Pop });
        stats.on_event(QueueEvent::CopyOverflow { dropped: 3 });

        assert_eq!(
            stats.snapshot(),
            QueueStatsSnapshot {
                push_drops: 2,
                pop_timeouts: 1,
                cancellations: 1,
                copy_overflow_drops: 3,
            }
        );
    }

    #[test]
    fn test_channel_observer_never_blocks() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let observer = ChannelObserver::new(tx);

        observer.on_event(QueueEvent::PopTimedOut);
        // Channel is full; this one is discarded instead of blocking.
        observer.on_event(QueueEvent::PushTimedOut { len: 1, capacity: 1 });

        assert_eq!(rx.try_recv().unwrap(), QueueEvent::PopTimedOut);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fan_out_reaches_all() {
        let a = Arc::new(QueueStats::new());
        let b = Arc::new(QueueStats::new());
        let fan_out = FanOut::new().with(a.clone()).with(b.clone());

        fan_out.on_event(QueueEvent::PopTimedOut);

        assert_eq!(a.snapshot().pop_timeouts, 1);
        assert_eq!(b.snapshot().pop_timeouts, 1);
    }

    #[test]
    fn test_log_observer_does_not_panic() {
        let observer = LogObserver::new("video");
        observer.on_event(QueueEvent::PushTimedOut { len: 4, capacity: 4 });
    }

    #[test]
    fn test_event_display() {
        assert_eq!(
            QueueEvent::PushTimedOut { len: 2, capacity: 2 }.to_string(),
            "Cannot add frame, queue is full (2/2)"
        );
        assert_eq!(
            QueueEvent::Cancelled { op: QueueOp::Push }.to_string(),
            "Push cancelled"
        );
    }
}
