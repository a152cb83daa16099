use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::cancel::CancellationToken;
use crate::core::config::QueueConfig;
use crate::core::frame_queue::FrameQueue;
use crate::core::observer::{FanOut, LogObserver, QueueObserver, QueueStats, QueueStatsSnapshot};
use crate::frame::{AudioCodec, AudioFrame, Frame, VideoCodec, VideoFrame};
use crate::shared::constants;
use crate::utils::logger;
use crate::utils::time_utils::Timer;

/// Annex-B start code in front of every synthetic NAL unit
const START_CODE: [u8; 4] = [0, 0, 0, 1];
const ADTS_HEADER_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub fps: u32,
    pub frames: u64,
    /// Simulated decode cost per consumed frame
    pub decode_delay: Duration,
    /// Replace the queue once this many frames have been produced
    pub reconnect_after: Option<u64>,
    pub payload_bytes: usize,
    /// Every n-th video frame is an IDR frame
    pub keyframe_interval: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fps: constants::DEFAULT_SIM_FPS,
            frames: constants::DEFAULT_SIM_FRAMES,
            decode_delay: Duration::ZERO,
            reconnect_after: None,
            payload_bytes: constants::DEFAULT_SIM_PAYLOAD_BYTES,
            keyframe_interval: constants::DEFAULT_KEYFRAME_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub media: String,
    pub produced: u64,
    pub pushed: u64,
    pub dropped: u64,
    pub consumed: u64,
    /// Consumed frames whose pts did not advance past the previous one
    pub out_of_order: u64,
    pub reconnects: u32,
    /// Frames moved to the replacement queue on reconnect
    pub carried_over: u64,
    pub cancelled: bool,
    pub elapsed_ms: u64,
    pub queue: QueueStatsSnapshot,
}

#[derive(Debug, Default)]
struct ProducerTally {
    produced: u64,
    pushed: u64,
    dropped: u64,
    reconnects: u32,
    carried_over: u64,
}

#[derive(Debug, Default)]
struct ConsumerTally {
    consumed: u64,
    out_of_order: u64,
}

/// Marks the producer finished even if it bails out early, and closes the
/// live queue so an idle consumer does not sit out its pop timeout.
struct DoneOnDrop<'a, T: Frame> {
    done: &'a AtomicBool,
    slot: &'a Mutex<Arc<FrameQueue<T>>>,
}

impl<T: Frame> Drop for DoneOnDrop<'_, T> {
    fn drop(&mut self) {
        self.done.store(true, Ordering::SeqCst);
        current(self.slot).close();
    }
}

/// H264 frame with a keyframe every `keyframe_interval` frames (0 is
/// treated as 1). The start code is outside the valid window.
pub fn synthetic_video_frame(
    index: u64,
    timestamp_ms: i64,
    payload_bytes: usize,
    keyframe_interval: u64,
) -> crate::error::Result<VideoFrame> {
    let is_keyframe = index % keyframe_interval.max(1) == 0;
    // IDR slice (5) or non-IDR slice (1)
    let nal_header: u8 = if is_keyframe { 0x65 } else { 0x41 };

    let mut buffer = Vec::with_capacity(START_CODE.len() + 1 + payload_bytes);
    buffer.extend_from_slice(&START_CODE);
    buffer.push(nal_header);
    buffer.extend((0..payload_bytes).map(|i| (index as usize + i) as u8));

    let length = buffer.len() - START_CODE.len();
    Ok(VideoFrame::new(
        VideoCodec::H264,
        is_keyframe,
        buffer,
        START_CODE.len(),
        length,
        timestamp_ms,
    )?
    .with_captured_timestamp(timestamp_ms))
}

/// AAC-LC frame; the ADTS header is outside the valid window
pub fn synthetic_audio_frame(
    index: u64,
    timestamp_ms: i64,
    payload_bytes: usize,
) -> crate::error::Result<AudioFrame> {
    let mut buffer = vec![0u8; ADTS_HEADER_LEN];
    buffer[0] = 0xff;
    buffer[1] = 0xf1;
    buffer.extend((0..payload_bytes).map(|i| (index as usize ^ i) as u8));

    AudioFrame::new(
        AudioCodec::AacLc,
        buffer,
        ADTS_HEADER_LEN,
        payload_bytes,
        timestamp_ms,
    )
}

/// Runs one paced producer and one consumer over a fresh queue.
///
/// `make_frame(index, pts_ms)` builds each frame. The run ends when all
/// frames are produced and the queue has drained, or when `cancel` fires.
pub fn run_pipeline<T, F>(
    label: &str,
    config: &QueueConfig,
    options: &PipelineOptions,
    make_frame: F,
    cancel: &CancellationToken,
) -> Result<PipelineReport>
where
    T: Frame + Clone,
    F: Fn(u64, i64) -> crate::error::Result<T> + Sync,
{
    let stats = Arc::new(QueueStats::new());
    let observer: Arc<dyn QueueObserver> = Arc::new(
        FanOut::new()
            .with(stats.clone())
            .with(Arc::new(LogObserver::new(label))),
    );
    let build_queue = || -> Result<Arc<FrameQueue<T>>> {
        let queue = FrameQueue::from_config(config)
            .context("failed to create frame queue")?
            .with_observer(observer.clone());
        Ok(Arc::new(queue))
    };

    let slot = Mutex::new(build_queue()?);
    let producer_done = AtomicBool::new(false);
    let timer = Timer::new();

    logger::info(&format!(
        "Pipeline [{}] starting: {} frames @ {}fps, capacity {}",
        label, options.frames, options.fps, config.capacity
    ));

    let outcome = crossbeam::scope(|s| {
        let producer = s.spawn(|_| {
            let _done = DoneOnDrop {
                done: &producer_done,
                slot: &slot,
            };
            produce(label, &slot, &build_queue, options, &make_frame, cancel)
        });
        let consumer = s.spawn(|_| consume(&slot, &producer_done, options, cancel));
        (producer.join(), consumer.join())
    });

    let (producer, consumer) = outcome.map_err(|_| anyhow!("pipeline thread scope panicked"))?;
    let tally = producer.map_err(|_| anyhow!("producer thread panicked"))??;
    let consumer = consumer.map_err(|_| anyhow!("consumer thread panicked"))?;
    if consumer.out_of_order > 0 {
        logger::warn(&format!(
            "Pipeline [{}] consumed {} frames out of order",
            label, consumer.out_of_order
        ));
    }

    let report = PipelineReport {
        media: label.to_string(),
        produced: tally.produced,
        pushed: tally.pushed,
        dropped: tally.dropped,
        consumed: consumer.consumed,
        out_of_order: consumer.out_of_order,
        reconnects: tally.reconnects,
        carried_over: tally.carried_over,
        cancelled: cancel.is_cancelled(),
        elapsed_ms: timer.elapsed_ms(),
        queue: stats.snapshot(),
    };

    logger::info(&format!(
        "Pipeline [{}] finished: pushed {}, dropped {}, consumed {}",
        label, report.pushed, report.dropped, report.consumed
    ));
    Ok(report)
}

fn current<T>(slot: &Mutex<Arc<FrameQueue<T>>>) -> Arc<FrameQueue<T>> {
    match slot.lock() {
        Ok(queue) => Arc::clone(&queue),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

fn produce<T, F>(
    label: &str,
    slot: &Mutex<Arc<FrameQueue<T>>>,
    build_queue: &dyn Fn() -> Result<Arc<FrameQueue<T>>>,
    options: &PipelineOptions,
    make_frame: &F,
    cancel: &CancellationToken,
) -> Result<ProducerTally>
where
    T: Frame + Clone,
    F: Fn(u64, i64) -> crate::error::Result<T>,
{
    let fps = options.fps.max(1) as f64;
    let frame_interval = Duration::from_secs_f64(1.0 / fps);
    let start = Instant::now();
    let mut tally = ProducerTally::default();

    for index in 0..options.frames {
        if cancel.is_cancelled() {
            logger::debug(&format!("Producer [{}] cancelled at frame {}", label, index));
            break;
        }

        let target = start + frame_interval.mul_f64(index as f64);
        let now = Instant::now();
        if target > now {
            thread::sleep(target - now);
        }

        let pts_ms = (index as f64 * 1000.0 / fps) as i64;
        let frame = make_frame(index, pts_ms)
            .with_context(|| format!("failed to build frame {}", index))?;
        tally.produced += 1;

        let queue = current(slot);
        if queue.push_cancellable(frame, queue.default_push_timeout(), cancel) {
            tally.pushed += 1;
        } else if cancel.is_cancelled() {
            break;
        } else {
            tally.dropped += 1;
        }

        if options.reconnect_after == Some(index + 1) {
            let fresh = build_queue()?;
            // Publish first: a consumer woken by `close` must find the new queue.
            match slot.lock() {
                Ok(mut guard) => *guard = Arc::clone(&fresh),
                Err(poisoned) => *poisoned.into_inner() = Arc::clone(&fresh),
            }
            queue.close();
            let carried = queue.drain_into(&fresh);

            tally.reconnects += 1;
            tally.carried_over += carried as u64;
            logger::info(&format!(
                "Producer [{}] replaced queue after {} frames, carried over {}",
                label,
                index + 1,
                carried
            ));
        }
    }

    Ok(tally)
}

fn consume<T: Frame>(
    slot: &Mutex<Arc<FrameQueue<T>>>,
    producer_done: &AtomicBool,
    options: &PipelineOptions,
    cancel: &CancellationToken,
) -> ConsumerTally {
    let mut tally = ConsumerTally::default();
    let mut last_pts: Option<i64> = None;

    while !cancel.is_cancelled() {
        let queue = current(slot);
        match queue.pop_cancellable(queue.default_pop_timeout(), cancel) {
            Some(frame) => {
                tally.consumed += 1;
                let pts = frame.timestamp_ms();
                if last_pts.map_or(false, |last| pts <= last) {
                    tally.out_of_order += 1;
                }
                last_pts = Some(pts);
                if !options.decode_delay.is_zero() {
                    thread::sleep(options.decode_delay);
                }
                drop(frame);
            }
            None => {
                if producer_done.load(Ordering::SeqCst) && current(slot).is_empty() {
                    break;
                }
            }
        }
    }

    tally
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config(capacity: usize) -> QueueConfig {
        QueueConfig {
            capacity,
            push_timeout_ms: 5,
            pop_timeout_ms: 20,
        }
    }

    #[test]
    fn test_synthetic_video_frame_layout() {
        let key = synthetic_video_frame(0, 0, 16, 30).unwrap();
        assert!(key.is_keyframe());
        assert_eq!(key.offset(), 4);
        assert_eq!(key.length(), 17);
        assert_eq!(key.payload()[0], 0x65);
        assert_eq!(key.captured_timestamp_ms(), Some(0));

        let delta = synthetic_video_frame(1, 33, 16, 30).unwrap();
        assert!(!delta.is_keyframe());
        assert_eq!(delta.payload()[0], 0x41);
        assert_eq!(delta.timestamp_ms(), 33);
    }

    #[test]
    fn test_keyframe_interval() {
        let keyframes: Vec<u64> = (0..10)
            .filter(|&i| synthetic_video_frame(i, 0, 4, 4).unwrap().is_keyframe())
            .collect();
        assert_eq!(keyframes, vec![0, 4, 8]);

        // Zero interval: every frame is a keyframe.
        assert!(synthetic_video_frame(3, 0, 4, 0).unwrap().is_keyframe());
    }

    #[test]
    fn test_synthetic_audio_frame_layout() {
        let frame = synthetic_audio_frame(3, 69, 32).unwrap();
        assert_eq!(frame.codec(), AudioCodec::AacLc);
        assert_eq!(frame.offset(), ADTS_HEADER_LEN);
        assert_eq!(frame.length(), 32);
        assert_eq!(&frame.data()[..2], &[0xff, 0xf1]);
    }

    #[test]
    fn test_pipeline_delivers_all_frames() {
        let options = PipelineOptions {
            fps: 500,
            frames: 50,
            payload_bytes: 64,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();

        let report = run_pipeline(
            "video",
            &fast_config(64),
            &options,
            |index, pts| {
                synthetic_video_frame(index, pts, options.payload_bytes, options.keyframe_interval)
            },
            &cancel,
        )
        .unwrap();

        assert_eq!(report.produced, 50);
        assert_eq!(report.pushed, 50);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.consumed, 50);
        assert_eq!(report.out_of_order, 0);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_slow_consumer_causes_counted_drops() {
        let options = PipelineOptions {
            fps: 1000,
            frames: 60,
            decode_delay: Duration::from_millis(10),
            payload_bytes: 8,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();

        let report = run_pipeline(
            "audio",
            &fast_config(2),
            &options,
            |index, pts| synthetic_audio_frame(index, pts, options.payload_bytes),
            &cancel,
        )
        .unwrap();

        assert_eq!(report.produced, 60);
        assert_eq!(report.pushed + report.dropped, report.produced);
        assert!(report.dropped > 0);
        assert_eq!(report.queue.push_drops, report.dropped);
        assert_eq!(report.consumed, report.pushed);
    }

    #[test]
    fn test_reconnect_keeps_in_flight_frames() {
        let options = PipelineOptions {
            fps: 500,
            frames: 40,
            reconnect_after: Some(20),
            decode_delay: Duration::from_millis(1),
            payload_bytes: 16,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();

        let report = run_pipeline(
            "video",
            &fast_config(64),
            &options,
            |index, pts| {
                synthetic_video_frame(index, pts, options.payload_bytes, options.keyframe_interval)
            },
            &cancel,
        )
        .unwrap();

        assert_eq!(report.reconnects, 1);
        assert_eq!(report.pushed + report.dropped, report.produced);
        assert_eq!(report.consumed, report.pushed);
        assert_eq!(report.out_of_order, 0);
    }

    #[test]
    fn test_reconnect_with_idle_consumer_and_default_pop_timeout() {
        let config = QueueConfig {
            capacity: 4,
            push_timeout_ms: 5,
            pop_timeout_ms: 1000,
        };
        let options = PipelineOptions {
            fps: 200,
            frames: 40,
            reconnect_after: Some(10),
            payload_bytes: 8,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();

        let report = run_pipeline(
            "video",
            &config,
            &options,
            |index, pts| {
                synthetic_video_frame(index, pts, options.payload_bytes, options.keyframe_interval)
            },
            &cancel,
        )
        .unwrap();

        assert_eq!(report.reconnects, 1);
        assert_eq!(report.produced, 40);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.pushed, 40);
        assert_eq!(report.consumed, 40);
        assert_eq!(report.out_of_order, 0);
        assert_eq!(report.queue.pop_timeouts, 0);
        // 40 frames at 200fps take about 200ms; nobody sits out a pop timeout.
        assert!(report.elapsed_ms < 1000, "elapsed {}ms", report.elapsed_ms);
    }

    #[test]
    fn test_cancel_stops_pipeline() {
        let options = PipelineOptions {
            fps: 50,
            frames: 10_000,
            payload_bytes: 8,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();
        let remote = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let start = Instant::now();
        let report = run_pipeline(
            "video",
            &QueueConfig::with_capacity(8),
            &options,
            |index, pts| {
                synthetic_video_frame(index, pts, options.payload_bytes, options.keyframe_interval)
            },
            &cancel,
        )
        .unwrap();
        canceller.join().unwrap();

        assert!(report.cancelled);
        assert!(report.produced < options.frames);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_frame_factory_error_is_reported() {
        let options = PipelineOptions {
            fps: 1000,
            frames: 5,
            ..PipelineOptions::default()
        };
        let cancel = CancellationToken::new();

        let result = run_pipeline(
            "video",
            &fast_config(4),
            &options,
            |index, pts| {
                if index == 2 {
                    VideoFrame::new(VideoCodec::H264, false, vec![0u8; 2], 1, 4, pts)
                } else {
                    synthetic_video_frame(index, pts, 8, 30)
                }
            },
            &cancel,
        );

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("failed to build frame 2"));
    }
}
