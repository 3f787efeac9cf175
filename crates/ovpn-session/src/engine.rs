//! Tunnel engine seam
//!
//! The tunnel engine owns the actual VPN protocol session (handshake,
//! encryption, packet tunneling) and is treated as an opaque capability.
//! `start` kicks the session off and returns quickly; slow failures
//! arrive asynchronously through the engine's status event stream, which
//! the host adapter feeds into the controller.

use tracing::warn;

use crate::profile::Profile;

/// Commands into the external tunnel engine.
pub trait TunnelEngine: Send + Sync {
    /// Request a tunnel session for the given profile.
    ///
    /// Implementations should dispatch and return; handshake progress
    /// and late failures are reported through the event stream.
    fn start(&self, profile: &Profile) -> Result<(), EngineError>;

    /// Request the tunnel session to stop.
    fn stop(&self, force: bool) -> Result<(), EngineError>;
}

/// Failure reported synchronously by an engine call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// Status event kinds the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEventKind {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Error,
}

impl EngineEventKind {
    /// Map a raw engine state string to a known kind.
    ///
    /// The external core reports states as strings; anything it emits
    /// beyond these five is not a lifecycle signal and is dropped by the
    /// adapter.
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "CONNECTING" => Some(Self::Connecting),
            "CONNECTED" => Some(Self::Connected),
            "RECONNECTING" => Some(Self::Reconnecting),
            "DISCONNECTED" => Some(Self::Disconnected),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One asynchronous status notification from the engine.
#[derive(Debug, Clone)]
pub struct EngineEvent {
    pub kind: EngineEventKind,
    /// Log message accompanying the state, if any
    pub message: Option<String>,
}

impl EngineEvent {
    pub fn new(kind: EngineEventKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn with_message(kind: EngineEventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Adapt a raw engine state string, logging and dropping unknown
    /// kinds.
    pub fn from_raw(state: &str, message: Option<&str>) -> Option<Self> {
        match EngineEventKind::parse(state) {
            Some(kind) => Some(Self {
                kind,
                message: message.map(str::to_owned),
            }),
            None => {
                warn!(state, "ignoring unknown engine state");
                None
            }
        }
    }
}
