use super::counters::{IoCounters, IoSnapshot};
use crate::context::{BandwidthSample, SimulationContext};
use crate::error::Result;
use crate::events::{EventBus, PlaybackEvent};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, trace};

/// Derives throughput estimates from successive counter snapshots
pub struct BandwidthEstimator {
    counters: Arc<dyn IoCounters>,
    baseline: Option<(IoSnapshot, Instant)>,
    normalize_per_second: bool,
}

impl BandwidthEstimator {
    pub fn new(counters: Arc<dyn IoCounters>) -> Self {
        Self {
            counters,
            baseline: None,
            normalize_per_second: false,
        }
    }

    /// Divide each delta by the elapsed time so estimates are per second
    pub fn normalize_per_second(mut self, enabled: bool) -> Self {
        self.normalize_per_second = enabled;
        self
    }

    /// Capture the baseline the first sample is measured against
    pub fn prime(&mut self) -> Result<()> {
        let snapshot = self.counters.read()?;
        self.baseline = Some((snapshot, Instant::now()));
        Ok(())
    }

    /// Measure against the baseline, append to `context`'s series and move the baseline
    pub fn sample(&mut self, context: &SimulationContext) -> Result<BandwidthSample> {
        let kbps = self.measure()?;
        Ok(context.bandwidth.record(kbps))
    }

    fn measure(&mut self) -> Result<f64> {
        let current = self.counters.read()?;
        let now = Instant::now();

        let kbps = match self.baseline {
            Some((previous, taken_at)) => {
                let kilobits = current.delta_since(&previous) as f64 * 8.0 / 1000.0;
                if self.normalize_per_second {
                    let elapsed = now.duration_since(taken_at).as_secs_f64();
                    if elapsed > 0.0 {
                        kilobits / elapsed
                    } else {
                        0.0
                    }
                } else {
                    kilobits
                }
            }
            None => 0.0,
        };

        self.baseline = Some((current, now));
        trace!("Bandwidth estimate: {:.2} kbps", kbps);
        Ok(kbps)
    }

    /// Sample every `interval` until the run stops.
    ///
    /// Counter failures end the loop with `HostMetricUnavailable`.
    pub async fn run(
        mut self,
        context: Arc<SimulationContext>,
        event_bus: Arc<EventBus>,
        interval: Duration,
    ) -> Result<()> {
        self.prime()?;
        info!("Bandwidth estimator started (interval {:?})", interval);

        while context.run_state.sleep(interval).await {
            let sample = self.sample(&context)?;
            let _ = event_bus.publish(PlaybackEvent::BandwidthUpdated {
                kbps: sample.kbps,
                timestamp: SystemTime::now(),
            });
        }

        debug!(
            "Bandwidth estimator stopped after {} samples",
            context.bandwidth.len()
        );
        Ok(())
    }
}
