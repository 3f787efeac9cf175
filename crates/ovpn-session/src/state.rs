//! Session state
//!
//! The session phase is a closed enum; every transition site matches on
//! it exhaustively. The full status snapshot is shared with callers
//! through the controller handle and serializes with the field names the
//! host bridge expects.

use serde::{Deserialize, Serialize};

/// Discrete session lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// No session active
    #[default]
    Disconnected,
    /// Engine start requested, waiting for the tunnel to come up
    Connecting,
    /// Tunnel is up
    Connected,
    /// Scheduled retry is replaying the saved credentials
    Reconnecting,
    /// Session failed; reconnection policy may still recover it
    Error,
}

impl SessionPhase {
    /// Is the tunnel currently usable?
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionPhase::Connected)
    }

    /// Is there any session activity at all?
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionPhase::Disconnected)
    }

    /// Is the session in the failure phase?
    pub fn is_error(&self) -> bool {
        matches!(self, SessionPhase::Error)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Disconnected => "DISCONNECTED",
            SessionPhase::Connecting => "CONNECTING",
            SessionPhase::Connected => "CONNECTED",
            SessionPhase::Reconnecting => "RECONNECTING",
            SessionPhase::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of the session state machine.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Current phase
    #[serde(rename = "status")]
    pub phase: SessionPhase,
    /// Message from the most recent failure, cleared on recovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Reconnection attempts consumed in the current error cycle
    pub reconnect_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_predicates() {
        assert!(SessionPhase::Connected.is_connected());
        assert!(!SessionPhase::Connecting.is_connected());
        assert!(SessionPhase::Error.is_error());
        assert!(SessionPhase::Reconnecting.is_active());
        assert!(!SessionPhase::Disconnected.is_active());
    }

    #[test]
    fn test_phase_serializes_as_engine_style_string() {
        let json = serde_json::to_string(&SessionPhase::Reconnecting).unwrap();
        assert_eq!(json, "\"RECONNECTING\"");
    }

    #[test]
    fn test_status_serializes_with_bridge_field_names() {
        let status = SessionStatus {
            phase: SessionPhase::Error,
            last_error: Some("network connection lost".into()),
            reconnect_attempts: 2,
        };
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["lastError"], "network connection lost");
        assert_eq!(json["reconnectAttempts"], 2);
    }
}
