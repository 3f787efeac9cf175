//! Status observers
//!
//! The host bridge registers an observer to receive phase transitions
//! and periodic traffic samples. Delivery is best-effort: a failing
//! observer is logged and never disturbs the state machine. Phase
//! transitions are delivered in emission order; traffic samples may be
//! dropped.

use ovpn_stats::TrafficSample;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::state::SessionPhase;

/// One update pushed to the registered observer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Phase at the time of emission
    #[serde(rename = "status")]
    pub phase: SessionPhase,
    /// Failure message, present on error transitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Latest traffic sample, present on periodic stats emissions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_stats: Option<TrafficSample>,
}

/// Observer delivery failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("observer delivery failed: {0}")]
pub struct ObserverError(pub String);

/// Sink for session status updates.
pub trait StatusObserver: Send {
    fn deliver(&self, update: StatusUpdate) -> Result<(), ObserverError>;
}

/// Channel observers are the common case: the bridge adapter drains the
/// receiver and forwards updates to the host callback.
impl StatusObserver for mpsc::UnboundedSender<StatusUpdate> {
    fn deliver(&self, update: StatusUpdate) -> Result<(), ObserverError> {
        self.send(update)
            .map_err(|_| ObserverError("receiver dropped".into()))
    }
}

/// Wrap a closure as an observer.
pub fn observer_fn<F>(f: F) -> impl StatusObserver
where
    F: Fn(StatusUpdate) -> Result<(), ObserverError> + Send,
{
    struct FnObserver<F>(F);

    impl<F> StatusObserver for FnObserver<F>
    where
        F: Fn(StatusUpdate) -> Result<(), ObserverError> + Send,
    {
        fn deliver(&self, update: StatusUpdate) -> Result<(), ObserverError> {
            (self.0)(update)
        }
    }

    FnObserver(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_with_bridge_field_names() {
        let update = StatusUpdate {
            phase: SessionPhase::Connected,
            message: None,
            network_stats: Some(TrafficSample {
                bytes_sent: 10,
                bytes_received: 20,
                seconds_connected: 30,
            }),
        };
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json["status"], "CONNECTED");
        assert_eq!(json["networkStats"]["bytesSent"], 10);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_channel_observer_reports_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let update = StatusUpdate {
            phase: SessionPhase::Disconnected,
            message: None,
            network_stats: None,
        };
        assert!(tx.deliver(update).is_err());
    }
}
