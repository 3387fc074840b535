//! Clock and memory readings used to instrument pipeline stages

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of time and memory readings.
///
/// Injected into the pipeline so stages can be measured without touching
/// the real clock or process memory in tests.
pub trait Meter: Send + Sync {
    /// Monotonic time since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Memory currently used by the process, in bytes
    fn memory_used(&self) -> u64;
}

/// Meter backed by [`Instant`] and the process resident set size
#[derive(Debug, Clone)]
pub struct SystemMeter {
    origin: Instant,
}

impl SystemMeter {
    /// Create a meter whose clock starts now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for SystemMeter {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn memory_used(&self) -> u64 {
        resident_set_bytes().unwrap_or(0)
    }
}

// VmRSS in /proc/self/status is reported in kB whatever the page size.
#[cfg(target_os = "linux")]
fn resident_set_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg(not(target_os = "linux"))]
fn resident_set_bytes() -> Option<u64> {
    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => None,
    }
}

/// Deterministic meter for tests and reproducible runs.
///
/// Every call to [`Meter::now`] advances the clock by a fixed tick; memory
/// reads return whatever was last set.
#[derive(Debug)]
pub struct ManualMeter {
    tick_nanos: u64,
    clock_nanos: AtomicU64,
    memory: AtomicU64,
}

impl ManualMeter {
    /// Create a meter that advances by `tick` on each clock read
    pub fn new(tick: Duration) -> Self {
        Self {
            tick_nanos: u64::try_from(tick.as_nanos()).unwrap_or(u64::MAX),
            clock_nanos: AtomicU64::new(0),
            memory: AtomicU64::new(0),
        }
    }

    /// Set the memory reading
    pub fn set_memory(&self, bytes: u64) {
        self.memory.store(bytes, Ordering::SeqCst);
    }
}

impl Meter for ManualMeter {
    fn now(&self) -> Duration {
        let previous = self.clock_nanos.fetch_add(self.tick_nanos, Ordering::SeqCst);
        Duration::from_nanos(previous.saturating_add(self.tick_nanos))
    }

    fn memory_used(&self) -> u64 {
        self.memory.load(Ordering::SeqCst)
    }
}

/// Time and memory usage of one measured section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    /// Wall time between start and finish
    pub elapsed: Duration,
    /// Memory after minus memory before
    pub memory_delta_bytes: i64,
}

/// An in-progress measurement started with [`Measurement::start`]
#[derive(Debug, Clone, Copy)]
pub struct Measurement {
    started: Duration,
    memory_before: u64,
}

impl Measurement {
    /// Take the opening readings
    pub fn start(meter: &dyn Meter) -> Self {
        Self {
            started: meter.now(),
            memory_before: meter.memory_used(),
        }
    }

    /// Take the closing readings
    pub fn finish(self, meter: &dyn Meter) -> Usage {
        let elapsed = meter.now().saturating_sub(self.started);
        let memory_after = meter.memory_used();
        let memory_delta_bytes = i64::try_from(memory_after).unwrap_or(i64::MAX)
            - i64::try_from(self.memory_before).unwrap_or(i64::MAX);
        Usage {
            elapsed,
            memory_delta_bytes,
        }
    }
}
