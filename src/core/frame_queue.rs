use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use super::cancel::CancellationToken;
use super::config::QueueConfig;
use super::observer::{QueueEvent, QueueObserver, QueueOp};
use crate::error::{FrameQueueError, Result};
use crate::frame::{AudioFrame, Frame, VideoFrame};
use crate::shared::constants;
use crate::utils::time_utils::Deadline;

pub type VideoFrameQueue = FrameQueue<VideoFrame>;
pub type AudioFrameQueue = FrameQueue<AudioFrame>;

/// Bounded FIFO handing frames from a demuxer thread to a decoder thread.
///
/// Full and empty are not errors: `push` returns `false` when no slot frees up
/// within its timeout (the frame is dropped by the caller), and `pop` returns
/// `None` when nothing arrives. All state sits behind one mutex; `clear`,
/// `copy_into`, `drain_into` and `len` never wait on the condvars.
///
/// A queue can be retired with [`close`](Self::close): pushes are refused,
/// pops hand out what is left and then return `None` without waiting.
pub struct FrameQueue<T> {
    frames: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    push_timeout: Duration,
    pop_timeout: Duration,
    observer: Option<Arc<dyn QueueObserver>>,
}

enum WaitOutcome<'a, T> {
    Ready(MutexGuard<'a, VecDeque<T>>),
    TimedOut { len: usize },
    Cancelled,
    Closed,
}

impl<T: Frame> FrameQueue<T> {
    /// Creates a queue holding at most `capacity` frames
    ///
    /// # Errors
    /// `FrameQueueError::Configuration` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FrameQueueError::Configuration(
                "frame queue capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            closed: AtomicBool::new(false),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            push_timeout: Duration::from_millis(constants::DEFAULT_PUSH_TIMEOUT_MS),
            pop_timeout: Duration::from_millis(constants::DEFAULT_POP_TIMEOUT_MS),
            observer: None,
        })
    }

    pub fn from_config(config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.capacity)?.with_timeouts(config.push_timeout(), config.pop_timeout()))
    }

    /// Overrides the timeouts used by [`push`](Self::push) and [`pop`](Self::pop)
    pub fn with_timeouts(mut self, push_timeout: Duration, pop_timeout: Duration) -> Self {
        self.push_timeout = push_timeout;
        self.pop_timeout = pop_timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    pub fn default_push_timeout(&self) -> Duration {
        self.push_timeout
    }

    pub fn default_pop_timeout(&self) -> Duration {
        self.pop_timeout
    }

    /// Pushes with the default push timeout (5ms unless configured)
    pub fn push(&self, frame: T) -> bool {
        self.offer(frame, self.push_timeout, None).is_ok()
    }

    pub fn push_timeout(&self, frame: T, timeout: Duration) -> bool {
        self.offer(frame, timeout, None).is_ok()
    }

    /// Like [`push_timeout`](Self::push_timeout), but gives up once `cancel`
    /// fires.
    ///
    /// The token only interrupts waiting: if a slot is free the frame is
    /// inserted even when the token was cancelled before the call. Check
    /// [`CancellationToken::is_cancelled`] first to refuse work outright.
    pub fn push_cancellable(&self, frame: T, timeout: Duration, cancel: &CancellationToken) -> bool {
        self.offer(frame, timeout, Some(cancel)).is_ok()
    }

    /// Inserts `frame` at the tail, waiting up to `timeout` for a free slot.
    ///
    /// On timeout or cancellation the frame is handed back untouched so the
    /// caller can decide whether to drop or retry it.
    pub fn offer(
        &self,
        frame: T,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<(), T> {
        let guard = self.lock();
        let capacity = self.capacity;

        match self.wait_until(guard, QueueOp::Push, timeout, cancel, |frames| {
            frames.len() < capacity
        }) {
            WaitOutcome::Ready(mut frames) => {
                frames.push_back(frame);
                drop(frames);
                self.not_empty.notify_one();
                Ok(())
            }
            WaitOutcome::TimedOut { len } => {
                self.notify(QueueEvent::PushTimedOut { len, capacity });
                Err(frame)
            }
            WaitOutcome::Cancelled => {
                self.notify(QueueEvent::Cancelled { op: QueueOp::Push });
                Err(frame)
            }
            WaitOutcome::Closed => Err(frame),
        }
    }

    /// Pops with the default pop timeout (1000ms unless configured)
    pub fn pop(&self) -> Option<T> {
        self.poll(self.pop_timeout, None)
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.poll(timeout, None)
    }

    /// Like [`pop_timeout`](Self::pop_timeout), but gives up once `cancel`
    /// fires. A queued frame is still returned when the token is already
    /// cancelled; only the wait for a new one is cut short.
    pub fn pop_cancellable(&self, timeout: Duration, cancel: &CancellationToken) -> Option<T> {
        self.poll(timeout, Some(cancel))
    }

    fn poll(&self, timeout: Duration, cancel: Option<&CancellationToken>) -> Option<T> {
        let guard = self.lock();

        match self.wait_until(guard, QueueOp::Pop, timeout, cancel, |frames| {
            !frames.is_empty()
        }) {
            WaitOutcome::Ready(mut frames) => {
                let frame = frames.pop_front();
                drop(frames);
                self.not_full.notify_one();
                frame
            }
            WaitOutcome::TimedOut { .. } => {
                self.notify(QueueEvent::PopTimedOut);
                None
            }
            WaitOutcome::Cancelled => {
                self.notify(QueueEvent::Cancelled { op: QueueOp::Pop });
                None
            }
            WaitOutcome::Closed => None,
        }
    }

    /// Drops every queued frame
    pub fn clear(&self) {
        self.lock().clear();
        self.not_full.notify_all();
    }

    /// Appends a snapshot of this queue, oldest first, to `dst` without
    /// draining it. Returns the number of frames copied.
    ///
    /// Frames that do not fit in `dst` are skipped and reported to the
    /// destination's observer as [`QueueEvent::CopyOverflow`]. Copying a
    /// queue into itself does nothing.
    pub fn copy_into(&self, dst: &FrameQueue<T>) -> usize
    where
        T: Clone,
    {
        if std::ptr::eq(self, dst) {
            return 0;
        }

        // Never hold both queue locks at once.
        let snapshot: Vec<T> = self.lock().iter().cloned().collect();
        dst.append(snapshot)
    }

    /// Moves every queued frame, oldest first, to the tail of `dst` and
    /// leaves this queue empty. Returns the number of frames moved.
    ///
    /// Unlike [`copy_into`](Self::copy_into) each frame ends up in exactly
    /// one queue, so a consumer still popping from `self` can never receive
    /// a frame that was also handed to `dst`. Overflow is reported the same
    /// way.
    pub fn drain_into(&self, dst: &FrameQueue<T>) -> usize {
        if std::ptr::eq(self, dst) {
            return 0;
        }

        let taken = std::mem::take(&mut *self.lock());
        self.not_full.notify_all();
        dst.append(taken)
    }

    /// Retires the queue and wakes every blocked caller.
    ///
    /// Pending and later pushes fail without waiting. Pops still return the
    /// frames left in the queue, then `None` without waiting.
    pub fn close(&self) {
        {
            let _frames = self.lock();
            self.closed.store(true, Ordering::SeqCst);
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Appends as many of `frames` as fit and reports the rest as overflow
    fn append<I>(&self, frames: I) -> usize
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let frames = frames.into_iter();
        let total = frames.len();

        let appended = {
            let mut queued = self.lock();
            let room = self.capacity.saturating_sub(queued.len());
            let appended = total.min(room);
            queued.extend(frames.take(appended));
            appended
        };

        if appended > 0 {
            self.not_empty.notify_all();
        }
        if appended < total {
            self.notify(QueueEvent::CopyOverflow {
                dropped: total - appended,
            });
        }
        appended
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.frames.lock() {
            Ok(frames) => frames,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Waits until `ready` holds, the deadline passes, `cancel` fires or the
    /// queue is closed. With a token attached each wait is capped at
    /// `CANCEL_POLL_INTERVAL_MS` so cancellation is noticed promptly.
    fn wait_until<'a>(
        &'a self,
        mut guard: MutexGuard<'a, VecDeque<T>>,
        op: QueueOp,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
        ready: impl Fn(&VecDeque<T>) -> bool,
    ) -> WaitOutcome<'a, T> {
        let deadline = Deadline::after(timeout);
        let poll_interval = Duration::from_millis(constants::CANCEL_POLL_INTERVAL_MS);
        let condvar = match op {
            QueueOp::Push => &self.not_full,
            QueueOp::Pop => &self.not_empty,
        };

        loop {
            // `closed` only flips under this lock, so it cannot change between
            // this check and the wait below.
            let closed = self.is_closed();
            if closed && op == QueueOp::Push {
                return WaitOutcome::Closed;
            }
            if ready(&*guard) {
                return WaitOutcome::Ready(guard);
            }
            if closed {
                return WaitOutcome::Closed;
            }
            if cancel.map_or(false, CancellationToken::is_cancelled) {
                return WaitOutcome::Cancelled;
            }

            let Some(remaining) = deadline.remaining() else {
                return WaitOutcome::TimedOut { len: guard.len() };
            };
            let wait = if cancel.is_some() {
                remaining.min(poll_interval)
            } else {
                remaining
            };

            guard = match condvar.wait_timeout(guard, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn notify(&self, event: QueueEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}
