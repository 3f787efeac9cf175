//! Traffic monitor
//!
//! Tracks one session's network usage as a diff against the counters
//! captured when tracking started.
//!
//! # Edge Cases
//!
//! - `sample()` before any `start_tracking()` arms tracking on the spot
//!   and yields a degenerate all-zero first sample. This is observable
//!   behavior callers rely on ("no session yet" reads as zeros).
//! - `stop_tracking()` keeps the baseline, so a stale sample can still be
//!   read until the next `start_tracking()` rebaselines.
//! - If the underlying counters reset mid-span (device reboot without a
//!   process restart) deltas go negative. Not corrected here.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::source::{ByteCountSource, CounterSnapshot, SystemCounters};

/// Counters captured at the start of a tracking span.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    rx_bytes: u64,
    tx_bytes: u64,
    started: Instant,
}

/// Per-session usage derived from one poll.
///
/// Byte deltas are signed: a counter reset underneath a tracking span
/// drives them negative, and that is surfaced rather than masked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSample {
    /// Bytes sent since tracking started
    pub bytes_sent: i64,
    /// Bytes received since tracking started
    pub bytes_received: i64,
    /// Whole seconds since tracking started
    #[serde(rename = "timeConnected")]
    pub seconds_connected: u64,
}

/// Computes per-session traffic by diffing device-wide counters against
/// a baseline.
///
/// Not designed for concurrent use; callers serialize access (the
/// session controller shares one behind a mutex).
pub struct TrafficMonitor {
    source: Box<dyn ByteCountSource + Send>,
    baseline: Option<Baseline>,
    tracking: bool,
}

impl TrafficMonitor {
    /// Create a monitor over the OS interface counters.
    pub fn new() -> Self {
        Self::with_source(Box::new(SystemCounters::new()))
    }

    /// Create a monitor over a custom counter source.
    pub fn with_source(source: Box<dyn ByteCountSource + Send>) -> Self {
        Self {
            source,
            baseline: None,
            tracking: false,
        }
    }

    /// Capture the current counters as the new baseline and start
    /// tracking.
    ///
    /// Calling this while already tracking resets the baseline.
    pub fn start_tracking(&mut self) {
        let CounterSnapshot { rx_bytes, tx_bytes } = self.source.totals();
        self.baseline = Some(Baseline {
            rx_bytes,
            tx_bytes,
            started: Instant::now(),
        });
        self.tracking = true;
        debug!(rx_bytes, tx_bytes, "traffic tracking started");
    }

    /// Stop tracking.
    ///
    /// The baseline is retained: a stale sample remains readable until
    /// the next `start_tracking()`.
    pub fn stop_tracking(&mut self) {
        self.tracking = false;
        debug!("traffic tracking stopped");
    }

    /// Is a tracking span currently active?
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Read the current session usage.
    ///
    /// If tracking was never started this arms it first, yielding an
    /// all-zero first sample.
    pub fn sample(&mut self) -> TrafficSample {
        let baseline = match self.baseline {
            Some(baseline) => baseline,
            None => {
                debug!("sample requested before tracking started, arming now");
                self.start_tracking();
                match self.baseline {
                    Some(baseline) => baseline,
                    None => return TrafficSample::default(),
                }
            }
        };

        let current = self.source.totals();
        TrafficSample {
            bytes_sent: current.tx_bytes as i64 - baseline.tx_bytes as i64,
            bytes_received: current.rx_bytes as i64 - baseline.rx_bytes as i64,
            seconds_connected: baseline.started.elapsed().as_secs(),
        }
    }
}

impl Default for TrafficMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counter source driven by shared atomics so tests can advance it.
    struct FakeCounters {
        rx: Arc<AtomicU64>,
        tx: Arc<AtomicU64>,
    }

    fn fake_source() -> (Arc<AtomicU64>, Arc<AtomicU64>, TrafficMonitor) {
        let rx = Arc::new(AtomicU64::new(0));
        let tx = Arc::new(AtomicU64::new(0));
        let monitor = TrafficMonitor::with_source(Box::new(FakeCounters {
            rx: rx.clone(),
            tx: tx.clone(),
        }));
        (rx, tx, monitor)
    }

    impl ByteCountSource for FakeCounters {
        fn totals(&mut self) -> CounterSnapshot {
            CounterSnapshot {
                rx_bytes: self.rx.load(Ordering::Relaxed),
                tx_bytes: self.tx.load(Ordering::Relaxed),
            }
        }
    }

    #[test]
    fn test_sample_before_start_is_zero() {
        let (rx, _tx, mut monitor) = fake_source();
        rx.store(5000, Ordering::Relaxed);

        let sample = monitor.sample();
        assert_eq!(sample.bytes_sent, 0);
        assert_eq!(sample.bytes_received, 0);
        assert_eq!(sample.seconds_connected, 0);

        // Lazy init armed tracking
        assert!(monitor.is_tracking());
    }

    #[test]
    fn test_deltas_against_baseline() {
        let (rx, tx, mut monitor) = fake_source();
        rx.store(1000, Ordering::Relaxed);
        tx.store(400, Ordering::Relaxed);

        monitor.start_tracking();
        rx.store(1750, Ordering::Relaxed);
        tx.store(640, Ordering::Relaxed);

        let sample = monitor.sample();
        assert_eq!(sample.bytes_received, 750);
        assert_eq!(sample.bytes_sent, 240);
    }

    #[test]
    fn test_deltas_monotonic_across_polls() {
        let (rx, tx, mut monitor) = fake_source();
        monitor.start_tracking();

        let mut last = monitor.sample();
        for step in 1..=5u64 {
            rx.fetch_add(step * 100, Ordering::Relaxed);
            tx.fetch_add(step * 10, Ordering::Relaxed);

            let sample = monitor.sample();
            assert!(sample.bytes_received >= last.bytes_received);
            assert!(sample.bytes_sent >= last.bytes_sent);
            last = sample;
        }
    }

    #[test]
    fn test_restart_resets_baseline() {
        let (rx, _tx, mut monitor) = fake_source();
        monitor.start_tracking();
        rx.store(900, Ordering::Relaxed);
        assert_eq!(monitor.sample().bytes_received, 900);

        monitor.start_tracking();
        assert_eq!(monitor.sample().bytes_received, 0);
    }

    #[test]
    fn test_stop_keeps_stale_sample_readable() {
        let (rx, _tx, mut monitor) = fake_source();
        monitor.start_tracking();
        rx.store(300, Ordering::Relaxed);

        monitor.stop_tracking();
        assert!(!monitor.is_tracking());

        // Baseline survives the stop, and reading does not re-arm
        assert_eq!(monitor.sample().bytes_received, 300);
        assert!(!monitor.is_tracking());
    }

    #[test]
    fn test_counter_reset_goes_negative() {
        let (rx, _tx, mut monitor) = fake_source();
        rx.store(10_000, Ordering::Relaxed);
        monitor.start_tracking();

        // Counters reset underneath the span
        rx.store(2_000, Ordering::Relaxed);
        assert_eq!(monitor.sample().bytes_received, -8_000);
    }

    #[test]
    fn test_sample_serializes_with_bridge_field_names() {
        let sample = TrafficSample {
            bytes_sent: 1,
            bytes_received: 2,
            seconds_connected: 3,
        };
        let json = serde_json::to_value(&sample).unwrap();

        assert_eq!(json["bytesSent"], 1);
        assert_eq!(json["bytesReceived"], 2);
        assert_eq!(json["timeConnected"], 3);
    }
}
