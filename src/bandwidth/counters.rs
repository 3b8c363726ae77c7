use crate::error::{AbrSimError, Result};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Cumulative host network byte counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoSnapshot {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

impl IoSnapshot {
    pub fn new(bytes_sent: u64, bytes_recv: u64) -> Self {
        Self {
            bytes_sent,
            bytes_recv,
        }
    }

    /// Bytes moved in either direction since `earlier`; counter resets count as zero
    pub fn delta_since(&self, earlier: &IoSnapshot) -> u64 {
        self.bytes_sent.saturating_sub(earlier.bytes_sent)
            + self.bytes_recv.saturating_sub(earlier.bytes_recv)
    }
}

/// Source of cumulative I/O counters
pub trait IoCounters: Send + Sync {
    fn read(&self) -> Result<IoSnapshot>;
}

/// Reads interface totals from a `/proc/net/dev` style table
#[derive(Debug, Clone)]
pub struct ProcNetDevCounters {
    path: PathBuf,
    include_loopback: bool,
}

impl ProcNetDevCounters {
    pub fn new<P: AsRef<Path>>(path: P, include_loopback: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            include_loopback,
        }
    }

    /// Sum the receive/transmit byte columns of every interface
    pub fn parse(contents: &str, include_loopback: bool) -> Result<IoSnapshot> {
        let mut snapshot = IoSnapshot::default();
        let mut interfaces = 0usize;

        for line in contents.lines() {
            let Some((name, fields)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || name.contains('|') {
                continue;
            }
            if !include_loopback && name == "lo" {
                continue;
            }

            let columns: Vec<&str> = fields.split_whitespace().collect();
            if columns.len() < 9 {
                return Err(AbrSimError::host_metric(format!(
                    "Interface '{}' has {} counter columns, expected at least 9",
                    name,
                    columns.len()
                )));
            }

            let parse = |value: &str| {
                value.parse::<u64>().map_err(|e| {
                    AbrSimError::host_metric(format!(
                        "Bad counter '{}' for interface '{}': {}",
                        value, name, e
                    ))
                })
            };

            snapshot.bytes_recv += parse(columns[0])?;
            snapshot.bytes_sent += parse(columns[8])?;
            interfaces += 1;
        }

        if interfaces == 0 {
            return Err(AbrSimError::host_metric("No network interfaces listed"));
        }

        Ok(snapshot)
    }
}

impl Default for ProcNetDevCounters {
    fn default() -> Self {
        Self::new("/proc/net/dev", true)
    }
}

impl IoCounters for ProcNetDevCounters {
    fn read(&self) -> Result<IoSnapshot> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            AbrSimError::host_metric(format!("Cannot read {}: {}", self.path.display(), e))
        })?;

        let snapshot = Self::parse(&contents, self.include_loopback)?;
        trace!(
            "I/O counters: sent={} recv={}",
            snapshot.bytes_sent,
            snapshot.bytes_recv
        );
        Ok(snapshot)
    }
}
