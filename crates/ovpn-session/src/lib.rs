//! ovpn-session - VPN Session Lifecycle Core
//!
//! Owns the connection lifecycle of a VPN session on behalf of a host
//! application bridge: the state machine, the automatic reconnection
//! policy, and periodic status + traffic updates. The tunnel protocol
//! itself lives in an external engine; this crate only drives it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     Host App Bridge                        │
//! │   connect / disconnect / status / stats      observer      │
//! └───────┬───────────────────────────────────────────▲───────┘
//!         │ SessionHandle                              │ updates
//!         ▼                                            │
//! ┌───────────────────────────────────────────────────────────┐
//! │               Session Controller (worker task)             │
//! │   state machine · reconnect policy · stats poller          │
//! └──┬──────────────┬──────────────┬──────────────────┬───────┘
//!    │ start/stop   │ events       │ samples          │ show/clear
//!    ▼              │              ▼                  ▼
//! ┌──────────┐      │       ┌────────────┐     ┌─────────────┐
//! │  Tunnel  │──────┘       │ ovpn-stats │     │  Wake lock, │
//! │  Engine  │              │  monitor   │     │ notification│
//! └──────────┘              └────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - **Single serialization point**: manual calls, engine events,
//!   connectivity signals and timer ticks all funnel through one worker
//!   mailbox; no state is mutated anywhere else
//! - **Flat-delay reconnection**: up to five replays of the saved
//!   credentials, five seconds apart, triggered by connectivity
//!   recovery
//! - **Live statistics**: a five-second poller pushes traffic samples
//!   alongside the phase while connected
//! - **Best-effort platform calls**: wake lock and notification
//!   failures are logged, never allowed to stall the state machine

mod config;
mod engine;
mod error;
mod observer;
mod platform;
mod profile;
mod session;
mod state;

pub use config::{ConfigError, SessionConfig};
pub use engine::{EngineError, EngineEvent, EngineEventKind, TunnelEngine};
pub use error::SessionError;
pub use observer::{ObserverError, StatusObserver, StatusUpdate, observer_fn};
pub use platform::{NotificationContent, Notifier, Platform, ResourceError, WakeLock};
pub use profile::{Credentials, ParseError, Profile, ProfileParser};
pub use session::{SessionController, SessionHandle};
pub use state::{SessionPhase, SessionStatus};
