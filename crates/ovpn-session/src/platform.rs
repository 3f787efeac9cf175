//! Platform resource seams
//!
//! Wake locks and foreground notifications are side-effecting OS calls
//! with no logic of their own. Both are exclusively owned by the session
//! controller, which pairs acquisition and release with state
//! transitions. Failures become `ResourceError`: logged, never allowed
//! to block the state machine.

use std::time::Duration;

use crate::state::SessionPhase;

/// Failure acquiring or releasing an OS-level resource.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ResourceError(pub String);

/// Keeps the device awake while a session is active.
///
/// Acquired on entering Connecting, released on entering Disconnected.
/// The controller releases on every exit path, so implementations only
/// need to honor the calls; `timeout` caps the hold as a safety net if
/// the process dies without releasing.
pub trait WakeLock: Send {
    fn acquire(&self, timeout: Duration) -> Result<(), ResourceError>;
    fn release(&self) -> Result<(), ResourceError>;
}

/// Ongoing foreground notification reflecting the session phase.
pub trait Notifier: Send {
    fn show(&self, content: &NotificationContent) -> Result<(), ResourceError>;
    fn clear(&self) -> Result<(), ResourceError>;
}

/// What the foreground notification displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub message: String,
    /// Ongoing notifications cannot be swiped away while the session runs
    pub ongoing: bool,
}

impl NotificationContent {
    /// Notification content for a phase, or `None` when the phase clears
    /// the notification instead.
    pub fn for_phase(phase: SessionPhase, detail: Option<&str>) -> Option<Self> {
        let (title, message) = match phase {
            SessionPhase::Connecting => ("VPN connecting", "Establishing VPN connection..."),
            SessionPhase::Connected => ("VPN connected", "VPN connection established"),
            SessionPhase::Reconnecting => ("VPN reconnecting", "Attempting to reconnect..."),
            SessionPhase::Error => ("VPN error", detail.unwrap_or("connection failed")),
            SessionPhase::Disconnected => return None,
        };
        Some(Self {
            title: title.to_string(),
            message: message.to_string(),
            ongoing: true,
        })
    }
}

/// Bundle of platform resources handed to the controller.
pub struct Platform {
    pub wake_lock: Box<dyn WakeLock>,
    pub notifier: Box<dyn Notifier>,
}

impl Platform {
    /// Platform that ignores every call. For headless use and tests.
    pub fn noop() -> Self {
        Self {
            wake_lock: Box::new(NoopWakeLock),
            notifier: Box::new(NoopNotifier),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::noop()
    }
}

struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self, _timeout: Duration) -> Result<(), ResourceError> {
        Ok(())
    }

    fn release(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}

struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn show(&self, _content: &NotificationContent) -> Result<(), ResourceError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}
