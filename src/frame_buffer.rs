use crate::frame::VideoFrame;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// Bounded FIFO of rendered-ready frames between producer and consumer.
///
/// The queue lives behind a single mutex held only for the push/pop itself;
/// waiting for space happens outside it on `Notify`.
pub struct FrameBuffer {
    inner: Mutex<BufferState>,
    capacity: usize,
    not_full: Notify,
    stats: FrameBufferStats,
}

struct BufferState {
    frames: VecDeque<VideoFrame>,
    finished: bool,
}

/// Result of a bounded push attempt
#[derive(Debug)]
pub enum PushOutcome {
    Pushed,
    /// Gave up before space appeared; the frame is handed back
    Abandoned(VideoFrame),
}

/// Counters for buffer monitoring
#[derive(Debug)]
pub struct FrameBufferStats {
    pub frames_pushed: AtomicU64,
    pub frames_popped: AtomicU64,
    /// Times the producer found the buffer full
    pub full_waits: AtomicU64,
    /// Times the consumer found the buffer empty
    pub empty_polls: AtomicU64,
    pub high_water_mark: AtomicUsize,
}

impl FrameBufferStats {
    fn new() -> Self {
        Self {
            frames_pushed: AtomicU64::new(0),
            frames_popped: AtomicU64::new(0),
            full_waits: AtomicU64::new(0),
            empty_polls: AtomicU64::new(0),
            high_water_mark: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> FrameBufferStatsSnapshot {
        FrameBufferStatsSnapshot {
            frames_pushed: self.frames_pushed.load(Ordering::Relaxed),
            frames_popped: self.frames_popped.load(Ordering::Relaxed),
            full_waits: self.full_waits.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            high_water_mark: self.high_water_mark.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.frames_pushed.store(0, Ordering::Relaxed);
        self.frames_popped.store(0, Ordering::Relaxed);
        self.full_waits.store(0, Ordering::Relaxed);
        self.empty_polls.store(0, Ordering::Relaxed);
        self.high_water_mark.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of frame buffer statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameBufferStatsSnapshot {
    pub frames_pushed: u64,
    pub frames_popped: u64,
    pub full_waits: u64,
    pub empty_polls: u64,
    pub high_water_mark: usize,
}

impl FrameBuffer {
    /// Create a buffer holding at most `capacity` frames
    ///
    /// # Example
    /// ```
    /// use abrsim::frame_buffer::FrameBuffer;
    ///
    /// let buffer = FrameBuffer::new(100);
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("Frame buffer capacity must be greater than 0");
        }

        debug!("Created frame buffer with capacity {}", capacity);

        Self {
            inner: Mutex::new(BufferState {
                frames: VecDeque::with_capacity(capacity),
                finished: false,
            }),
            capacity,
            not_full: Notify::new(),
            stats: FrameBufferStats::new(),
        }
    }

    /// Push without waiting; hands the frame back when full
    pub fn try_push(&self, frame: VideoFrame) -> Result<(), VideoFrame> {
        let len = {
            let mut state = self.inner.lock();
            if state.frames.len() >= self.capacity {
                drop(state);
                self.stats.full_waits.fetch_add(1, Ordering::Relaxed);
                return Err(frame);
            }
            trace!("Buffering frame {} ({}x{})", frame.id, frame.width, frame.height);
            state.frames.push_back(frame);
            state.frames.len()
        };

        self.stats.frames_pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.high_water_mark.fetch_max(len, Ordering::Relaxed);
        Ok(())
    }

    /// Push, waiting for space while `keep_waiting` holds.
    ///
    /// Space is re-checked under the buffer lock after every wake-up; wake-ups
    /// come from pops or, at the latest, after `idle`.
    pub async fn push(
        &self,
        mut frame: VideoFrame,
        idle: Duration,
        keep_waiting: impl Fn() -> bool,
    ) -> PushOutcome {
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(frame) {
                Ok(()) => return PushOutcome::Pushed,
                Err(returned) => frame = returned,
            }

            if !keep_waiting() {
                return PushOutcome::Abandoned(frame);
            }

            let _ = tokio::time::timeout(idle, notified).await;

            if !keep_waiting() {
                return PushOutcome::Abandoned(frame);
            }
        }
    }

    /// Pop the oldest frame, if any
    pub fn try_pop(&self) -> Option<VideoFrame> {
        let frame = self.inner.lock().frames.pop_front();

        match frame {
            Some(frame) => {
                self.stats.frames_popped.fetch_add(1, Ordering::Relaxed);
                self.not_full.notify_one();
                Some(frame)
            }
            None => {
                self.stats.empty_polls.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Mark that no more frames will be pushed this session
    pub fn finish(&self) {
        self.inner.lock().finished = true;
        debug!("Frame buffer marked finished");
    }

    /// True once finished and fully drained
    pub fn is_exhausted(&self) -> bool {
        let state = self.inner.lock();
        state.finished && state.frames.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }

    /// Drop buffered frames, keeping statistics; returns how many were dropped
    pub fn drain(&self) -> usize {
        let dropped = {
            let mut state = self.inner.lock();
            let dropped = state.frames.len();
            state.frames.clear();
            dropped
        };
        self.not_full.notify_waiters();
        if dropped > 0 {
            debug!("Dropped {} buffered frames", dropped);
        }
        dropped
    }

    /// Drop all frames and the finished marker
    pub fn clear(&self) {
        {
            let mut state = self.inner.lock();
            state.frames.clear();
            state.finished = false;
        }
        self.stats.reset();
        self.not_full.notify_waiters();
        debug!("Frame buffer cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> FrameBufferStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn create_test_frame(id: u64) -> VideoFrame {
        VideoFrame::new(id, vec![0u8; 12], 2, 2, FrameFormat::Rgb24)
    }

    #[test]
    fn test_fifo_order() {
        let buffer = FrameBuffer::new(5);
        for id in 1..=3 {
            buffer.try_push(create_test_frame(id)).unwrap();
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.try_pop().unwrap().id, 1);
        assert_eq!(buffer.try_pop().unwrap().id, 2);
        assert_eq!(buffer.try_pop().unwrap().id, 3);
        assert!(buffer.try_pop().is_none());

        let stats = buffer.stats();
        assert_eq!(stats.frames_pushed, 3);
        assert_eq!(stats.frames_popped, 3);
        assert_eq!(stats.empty_polls, 1);
        assert_eq!(stats.high_water_mark, 3);
    }

    #[test]
    fn test_try_push_rejects_when_full() {
        let buffer = FrameBuffer::new(2);
        buffer.try_push(create_test_frame(1)).unwrap();
        buffer.try_push(create_test_frame(2)).unwrap();

        let rejected = buffer.try_push(create_test_frame(3)).unwrap_err();
        assert_eq!(rejected.id, 3);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.stats().full_waits, 1);
    }

    #[tokio::test]
    async fn test_push_waits_for_space() {
        let buffer = Arc::new(FrameBuffer::new(1));
        buffer.try_push(create_test_frame(1)).unwrap();

        let producer = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                buffer
                    .push(create_test_frame(2), Duration::from_millis(50), || true)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(buffer.try_pop().unwrap().id, 1);

        let outcome = producer.await.unwrap();
        assert!(matches!(outcome, PushOutcome::Pushed));
        assert_eq!(buffer.try_pop().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_push_abandons_when_stopped() {
        let buffer = FrameBuffer::new(1);
        buffer.try_push(create_test_frame(1)).unwrap();

        let running = AtomicBool::new(true);
        let attempt = buffer.push(create_test_frame(2), Duration::from_millis(5), || {
            running.swap(false, Ordering::SeqCst)
        });

        match attempt.await {
            PushOutcome::Abandoned(frame) => assert_eq!(frame.id, 2),
            PushOutcome::Pushed => panic!("push should not succeed on a full buffer"),
        }
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_finish_and_clear() {
        let buffer = FrameBuffer::new(3);
        buffer.try_push(create_test_frame(1)).unwrap();
        buffer.finish();

        assert!(buffer.is_finished());
        assert!(!buffer.is_exhausted());
        buffer.try_pop();
        assert!(buffer.is_exhausted());

        buffer.try_push(create_test_frame(2)).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_finished());
        assert_eq!(buffer.stats().frames_pushed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_length_bounded_under_mismatched_rates() {
        let capacity = 8;
        let buffer = Arc::new(FrameBuffer::new(capacity));
        let done = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        for producer_id in 0..3u64 {
            let buffer = Arc::clone(&buffer);
            handles.push(tokio::spawn(async move {
                for i in 0..60u64 {
                    let frame = create_test_frame(producer_id * 1000 + i);
                    let outcome = buffer.push(frame, Duration::from_millis(2), || true).await;
                    assert!(matches!(outcome, PushOutcome::Pushed));
                    assert!(buffer.len() <= capacity);
                }
            }));
        }

        let consumer = {
            let buffer = Arc::clone(&buffer);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut popped = 0u64;
                let mut last_seen = [None::<u64>; 3];
                while popped < 180 {
                    if let Some(frame) = buffer.try_pop() {
                        let producer = (frame.id / 1000) as usize;
                        let seq = frame.id % 1000;
                        if let Some(previous) = last_seen[producer] {
                            assert!(seq > previous, "frames from one producer out of order");
                        }
                        last_seen[producer] = Some(seq);
                        popped += 1;
                    }
                    assert!(buffer.len() <= capacity);
                    tokio::time::sleep(Duration::from_micros(300)).await;
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        for handle in handles {
            handle.await.unwrap();
        }
        consumer.await.unwrap();

        assert!(done.load(Ordering::SeqCst));
        let stats = buffer.stats();
        assert_eq!(stats.frames_pushed, 180);
        assert_eq!(stats.frames_popped, 180);
        assert!(stats.high_water_mark <= capacity);
        assert!(buffer.is_empty());
    }
}
