mod counters;
mod estimator;

pub use counters::{IoCounters, IoSnapshot, ProcNetDevCounters};
pub use estimator::BandwidthEstimator;
