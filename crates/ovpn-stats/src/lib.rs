//! ovpn-stats - Per-Session Traffic Accounting
//!
//! Derives per-session network usage without access to tunnel-internal
//! counters, by diffing device-wide cumulative byte counters against a
//! baseline captured when a session starts.
//!
//! # How It Works
//!
//! ```text
//! session start          poll t1              poll t2
//!      │                    │                    │
//!      ▼                    ▼                    ▼
//! ┌──────────┐        ┌──────────┐        ┌──────────┐
//! │ baseline │        │ counters │        │ counters │
//! │ rx,tx,t0 │──diff─▶│ rx,tx,t1 │──diff─▶│ rx,tx,t2 │
//! └──────────┘        └──────────┘        └──────────┘
//!                      sample(t1)          sample(t2)
//! ```
//!
//! The baseline is captured once per tracking span and is NOT reset by
//! intermediate polls, so deltas grow monotonically while the underlying
//! counters do.

mod monitor;
mod source;

pub use monitor::{TrafficMonitor, TrafficSample};
pub use source::{ByteCountSource, CounterSnapshot, SystemCounters};
