//! Session error taxonomy
//!
//! Only `ConfigInvalid` (and `Closed`, for a shut-down controller) ever
//! crosses the public API boundary. Everything else is absorbed into the
//! state machine and surfaced as `phase = Error` plus a message.

/// Errors surfaced by the session controller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Profile failed to parse; reported to the caller, no state change.
    #[error("profile config invalid: {0}")]
    ConfigInvalid(String),

    /// Tunnel engine reported a failure; recoverable, drives the
    /// reconnection policy.
    #[error("tunnel engine error: {0}")]
    Engine(String),

    /// Network transport disappeared; treated like an engine error for
    /// policy purposes.
    #[error("network connection lost")]
    ConnectivityLost,

    /// The reconnection attempt cap was reached; terminal for this
    /// session, a forced disconnect follows.
    #[error("maximum reconnect attempts reached")]
    RetryExhausted,

    /// Failure acquiring or releasing an OS-level resource; logged,
    /// never blocks the state machine.
    #[error("platform resource error: {0}")]
    Resource(String),

    /// The controller worker has shut down.
    #[error("session controller is shut down")]
    Closed,
}
