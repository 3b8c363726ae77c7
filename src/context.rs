use crate::events::StopReason;
use crate::frame_buffer::FrameBuffer;
use crate::rendition::{RenditionTable, Resolution};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Shared cooperative-cancellation flag observed by every worker loop
#[derive(Debug)]
pub struct RunState {
    running: watch::Sender<bool>,
}

impl RunState {
    pub fn new() -> Self {
        let (running, _) = watch::channel(false);
        Self { running }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Set the flag; returns the previous value
    pub fn set(&self, running: bool) -> bool {
        self.running.send_replace(running)
    }

    /// Resolve once the flag reads false
    pub async fn stopped(&self) {
        let mut receiver = self.running.subscribe();
        let _ = receiver.wait_for(|running| !*running).await;
    }

    /// Sleep for `duration`, returning early when the flag drops.
    /// Returns whether the run is still active.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stopped() => {}
        }
        self.is_running()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// One throughput estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandwidthSample {
    /// Arrival order within the session
    pub sequence: u64,
    /// Estimated throughput, never negative
    pub kbps: f64,
    pub captured_at: DateTime<Utc>,
}

/// Append-only bandwidth series for a session
#[derive(Debug, Default)]
pub struct BandwidthHistory {
    samples: RwLock<Vec<BandwidthSample>>,
}

impl BandwidthHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an estimate and return the stored sample
    pub fn record(&self, kbps: f64) -> BandwidthSample {
        let mut samples = self.samples.write();
        let sample = BandwidthSample {
            sequence: samples.len() as u64,
            kbps: kbps.max(0.0),
            captured_at: Utc::now(),
        };
        samples.push(sample);
        sample
    }

    pub fn latest(&self) -> Option<BandwidthSample> {
        self.samples.read().last().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<BandwidthSample> {
        self.samples.read().clone()
    }

    /// Mean of all recorded estimates
    pub fn average_kbps(&self) -> Option<f64> {
        let samples = self.samples.read();
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().map(|s| s.kbps).sum::<f64>() / samples.len() as f64)
    }

    pub fn clear(&self) {
        self.samples.write().clear();
    }
}

/// State shared by the estimator, producer and consumer of one controller
pub struct SimulationContext {
    pub run_state: RunState,
    pub frame_buffer: FrameBuffer,
    pub bandwidth: BandwidthHistory,
    pub renditions: RenditionTable,
    current_rendition: Mutex<Resolution>,
    stop_reason: Mutex<Option<StopReason>>,
}

impl SimulationContext {
    pub fn new(renditions: RenditionTable, buffer_capacity: usize) -> Self {
        let initial = renditions.highest().resolution();
        Self {
            run_state: RunState::new(),
            frame_buffer: FrameBuffer::new(buffer_capacity),
            bandwidth: BandwidthHistory::new(),
            renditions,
            current_rendition: Mutex::new(initial),
            stop_reason: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn current_rendition(&self) -> Resolution {
        *self.current_rendition.lock()
    }

    /// Replace the current rendition; returns the previous one if it changed
    pub fn update_rendition(&self, target: Resolution) -> Option<Resolution> {
        let mut current = self.current_rendition.lock();
        if *current == target {
            return None;
        }
        let previous = std::mem::replace(&mut *current, target);
        Some(previous)
    }

    /// Flip RunState false; only the caller that performs the transition
    /// records its reason and gets `true` back
    pub fn end_run(&self, reason: StopReason) -> bool {
        let mut stop_reason = self.stop_reason.lock();
        if !self.run_state.set(false) {
            return false;
        }
        *stop_reason = Some(reason);
        true
    }

    /// Why the last session ended
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.lock().clone()
    }

    /// Prepare shared state for a fresh session
    pub fn reset(&self) {
        self.frame_buffer.clear();
        self.bandwidth.clear();
        *self.stop_reason.lock() = None;
        *self.current_rendition.lock() = self.renditions.highest().resolution();
        debug!("Simulation context reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_bandwidth_history_append_only() {
        let history = BandwidthHistory::new();
        assert!(history.latest().is_none());

        history.record(120.0);
        history.record(-5.0);
        let latest = history.latest().unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(latest.sequence, 1);
        assert_eq!(latest.kbps, 0.0);
        assert_eq!(history.average_kbps(), Some(60.0));

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_rendition_update_reports_changes_only() {
        let context = SimulationContext::new(RenditionTable::standard(), 4);
        assert_eq!(context.current_rendition(), Resolution::new(1920, 1080));

        assert_eq!(context.update_rendition(Resolution::new(1920, 1080)), None);
        assert_eq!(
            context.update_rendition(Resolution::new(640, 360)),
            Some(Resolution::new(1920, 1080))
        );
        assert_eq!(context.current_rendition(), Resolution::new(640, 360));

        context.reset();
        assert_eq!(context.current_rendition(), Resolution::new(1920, 1080));
    }

    #[test]
    fn test_end_run_records_first_reason_only() {
        let context = SimulationContext::new(RenditionTable::standard(), 4);
        assert!(!context.end_run(StopReason::Requested));
        assert_eq!(context.stop_reason(), None);

        context.run_state.set(true);
        assert!(context.end_run(StopReason::UserQuit));
        assert!(!context.end_run(StopReason::Requested));
        assert_eq!(context.stop_reason(), Some(StopReason::UserQuit));
        assert!(!context.is_running());
    }

    #[tokio::test]
    async fn test_run_state_sleep_returns_early_on_stop() {
        let context = Arc::new(SimulationContext::new(RenditionTable::standard(), 4));
        context.run_state.set(true);

        let sleeper = {
            let context = Arc::clone(&context);
            tokio::spawn(async move { context.run_state.sleep(Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(context.run_state.set(false));

        let still_running = tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleep should end when the run stops")
            .unwrap();
        assert!(!still_running);
    }
}
