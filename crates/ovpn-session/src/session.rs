//! Session controller
//!
//! Owns the VPN session state machine, drives the external tunnel
//! engine, applies the reconnection policy, and emits periodic
//! status + traffic updates.
//!
//! # Transitions
//!
//! | From | Event | To |
//! |------|-------|-----|
//! | Disconnected | manual connect | Connecting |
//! | Connecting | engine CONNECTED | Connected |
//! | Connecting / Connected / Reconnecting | engine ERROR | Error |
//! | any active | network lost | Error |
//! | Error | network available | Reconnecting (after flat delay) |
//! | Reconnecting | saved credentials replayed | Connecting |
//! | Error | scheduled retry exhausted | Error, then forced Disconnected |
//! | any | manual disconnect | Disconnected |
//!
//! # Concurrency
//!
//! Manual calls, engine events, connectivity signals and timer ticks
//! all mutate the same session state, so every write is routed through
//! one worker task's mailbox. The stats poller and the delayed
//! reconnect are spawned tasks that only ever send epoch-stamped tick
//! commands back into the mailbox; bumping the epoch invalidates every
//! tick already in flight, so a cancelled timer can never mutate state
//! for a newer session.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ovpn_stats::{TrafficMonitor, TrafficSample};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::engine::{EngineEvent, EngineEventKind, TunnelEngine};
use crate::error::SessionError;
use crate::observer::{StatusObserver, StatusUpdate};
use crate::platform::{NotificationContent, Platform};
use crate::profile::{Credentials, Profile, ProfileParser};
use crate::state::{SessionPhase, SessionStatus};

/// Commands serialized through the worker mailbox.
enum Command {
    Connect {
        credentials: Credentials,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Disconnect {
        reply: Option<oneshot::Sender<()>>,
    },
    EngineEvent(EngineEvent),
    Connectivity {
        available: bool,
    },
    RetryTick {
        epoch: u64,
    },
    PollTick {
        epoch: u64,
    },
    SetObserver(Box<dyn StatusObserver>),
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// One VPN session per controller; the controller owns the worker task
/// that holds all mutable session state.
pub struct SessionController {
    handle: SessionHandle,
    worker: JoinHandle<()>,
}

impl SessionController {
    /// Create a controller over the OS network counters.
    ///
    /// Spawns the worker task, so a tokio runtime must be current.
    pub fn new(
        engine: Arc<dyn TunnelEngine>,
        parser: Box<dyn ProfileParser>,
        platform: Platform,
        config: SessionConfig,
    ) -> Self {
        Self::with_monitor(engine, parser, platform, config, TrafficMonitor::new())
    }

    /// Create a controller with a custom traffic monitor.
    pub fn with_monitor(
        engine: Arc<dyn TunnelEngine>,
        parser: Box<dyn ProfileParser>,
        platform: Platform,
        config: SessionConfig,
        monitor: TrafficMonitor,
    ) -> Self {
        let (commands, mailbox) = mpsc::unbounded_channel();
        let status = Arc::new(RwLock::new(SessionStatus::default()));
        let monitor = Arc::new(Mutex::new(monitor));

        let worker = SessionWorker {
            engine,
            parser,
            platform,
            config,
            observer: None,
            status: status.clone(),
            monitor: monitor.clone(),
            commands: commands.downgrade(),
            credentials: None,
            epoch: 0,
            poll_task: None,
            retry_task: None,
            wake_lock_held: false,
        };
        let worker = tokio::spawn(worker.run(mailbox));

        Self {
            handle: SessionHandle {
                commands,
                status,
                monitor,
            },
            worker,
        }
    }

    /// Get a cheap cloneable handle to this session.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Tear the session down and wait for the worker to finish.
    ///
    /// Stops the engine if a session is active, cancels timers,
    /// releases the wake lock and clears the notification.
    pub async fn shutdown(self) {
        let (tx, rx) = oneshot::channel();
        if self
            .handle
            .commands
            .send(Command::Shutdown { reply: Some(tx) })
            .is_ok()
        {
            let _ = rx.await;
        }
        let _ = self.worker.await;
    }
}

/// Cloneable handle for driving a session.
///
/// All mutating calls are forwarded to the worker mailbox; `status` and
/// `network_stats` read shared snapshots and never block on the worker.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<RwLock<SessionStatus>>,
    monitor: Arc<Mutex<TrafficMonitor>>,
}

impl SessionHandle {
    /// Start a session with the given credentials and raw profile
    /// config.
    ///
    /// Resolves once the request is accepted (the tunnel itself comes
    /// up asynchronously). The only rejections are an unparseable
    /// config and a shut-down controller; engine failures surface
    /// through the Error phase instead.
    pub async fn connect(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
        raw_config: impl Into<String>,
    ) -> Result<(), SessionError> {
        let credentials = Credentials {
            username: username.into(),
            password: password.into(),
            raw_config: raw_config.into(),
        };
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect {
                credentials,
                reply: tx,
            })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Stop the session. Idempotent; a no-op success when already
    /// disconnected.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Disconnect { reply: Some(tx) })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Fire-and-forget disconnect, safe to call from a notification
    /// action callback.
    pub fn request_disconnect(&self) {
        if self
            .commands
            .send(Command::Disconnect { reply: None })
            .is_err()
        {
            debug!("disconnect request after controller shutdown, ignoring");
        }
    }

    /// Current state machine snapshot. Never blocks, never fails.
    pub fn status(&self) -> SessionStatus {
        read_status(&self.status).clone()
    }

    /// Current phase. Never blocks, never fails.
    pub fn phase(&self) -> SessionPhase {
        read_status(&self.status).phase
    }

    /// Latest traffic accounting sample.
    ///
    /// Before the session ever connects this reads as all zeros (the
    /// monitor arms itself on first read).
    pub fn network_stats(&self) -> TrafficSample {
        lock_monitor(&self.monitor).sample()
    }

    /// Feed one engine status event into the state machine.
    pub fn on_engine_event(&self, event: EngineEvent) {
        if self.commands.send(Command::EngineEvent(event)).is_err() {
            debug!("engine event after controller shutdown, dropping");
        }
    }

    /// Feed a raw engine state string, dropping unknown kinds.
    pub fn on_raw_engine_state(&self, state: &str, message: Option<&str>) {
        if let Some(event) = EngineEvent::from_raw(state, message) {
            self.on_engine_event(event);
        }
    }

    /// Feed an OS connectivity transition into the reconnection policy.
    pub fn on_connectivity_changed(&self, available: bool) {
        if self
            .commands
            .send(Command::Connectivity { available })
            .is_err()
        {
            debug!("connectivity signal after controller shutdown, dropping");
        }
    }

    /// Register the status observer, replacing any previous one.
    ///
    /// The new observer immediately receives the current status.
    pub fn set_observer(&self, observer: impl StatusObserver + 'static) {
        if self
            .commands
            .send(Command::SetObserver(Box::new(observer)))
            .is_err()
        {
            debug!("observer registration after controller shutdown, dropping");
        }
    }
}

/// Worker task owning all mutable session state.
struct SessionWorker {
    engine: Arc<dyn TunnelEngine>,
    parser: Box<dyn ProfileParser>,
    platform: Platform,
    config: SessionConfig,
    observer: Option<Box<dyn StatusObserver>>,
    status: Arc<RwLock<SessionStatus>>,
    monitor: Arc<Mutex<TrafficMonitor>>,
    /// Weak so the worker's own timers never keep the mailbox alive
    commands: mpsc::WeakUnboundedSender<Command>,
    /// Most recent manual connect parameters, replayed on reconnect
    credentials: Option<Credentials>,
    /// Bumped to invalidate in-flight timer ticks
    epoch: u64,
    poll_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
    wake_lock_held: bool,
}

impl SessionWorker {
    async fn run(mut self, mut mailbox: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = mailbox.recv().await {
            match command {
                Command::Shutdown { reply } => {
                    self.handle_shutdown();
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    return;
                }
                command => self.dispatch(command),
            }
        }
        // Every handle dropped without an explicit shutdown.
        self.handle_shutdown();
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Connect { credentials, reply } => {
                let result = self.handle_connect(credentials);
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.handle_disconnect();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            Command::EngineEvent(event) => self.handle_engine_event(event),
            Command::Connectivity { available } => self.handle_connectivity(available),
            Command::RetryTick { epoch } => self.handle_retry_tick(epoch),
            Command::PollTick { epoch } => self.handle_poll_tick(epoch),
            Command::SetObserver(observer) => self.handle_set_observer(observer),
            // Intercepted by the run loop
            Command::Shutdown { .. } => {}
        }
    }

    fn handle_connect(&mut self, credentials: Credentials) -> Result<(), SessionError> {
        let profile = match self.parse_profile(&credentials) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "rejecting connect: profile config invalid");
                return Err(e);
            }
        };

        // A fresh manual connect supersedes any scheduled retry and any
        // running poller, and starts a new error cycle.
        self.cancel_timers();
        self.set_attempts(0);
        self.start_session(profile, credentials);
        Ok(())
    }

    fn handle_disconnect(&mut self) {
        self.set_attempts(0);
        if self.phase() == SessionPhase::Disconnected {
            debug!("disconnect while already disconnected, nothing to do");
            return;
        }

        self.cancel_timers();
        if let Err(e) = self.engine.stop(false) {
            warn!(error = %e, "engine stop failed");
        }
        lock_monitor(&self.monitor).stop_tracking();
        self.release_wake_lock();
        self.transition(SessionPhase::Disconnected, None);
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let phase = self.phase();
        match (phase, event.kind) {
            (SessionPhase::Connecting, EngineEventKind::Connected) => {
                self.set_attempts(0);
                lock_monitor(&self.monitor).start_tracking();
                self.transition(SessionPhase::Connected, None);
                self.start_polling();
            }
            (
                SessionPhase::Connecting | SessionPhase::Connected | SessionPhase::Reconnecting,
                EngineEventKind::Error,
            ) => {
                let message = event
                    .message
                    .unwrap_or_else(|| "tunnel engine reported an error".to_string());
                self.stop_polling();
                self.transition(SessionPhase::Error, Some(message));
            }
            (phase, EngineEventKind::Disconnected) if phase.is_active() => {
                // The engine tore the session down on its own; mirror
                // the disconnect cleanup without issuing another stop.
                info!("engine reported disconnect");
                self.cancel_timers();
                lock_monitor(&self.monitor).stop_tracking();
                self.release_wake_lock();
                self.transition(SessionPhase::Disconnected, None);
            }
            (_, kind) => {
                debug!(%phase, ?kind, "engine event without transition, ignoring");
            }
        }
    }

    fn handle_connectivity(&mut self, available: bool) {
        let phase = self.phase();
        if available {
            debug!(%phase, "network available");
            if phase.is_error() {
                self.schedule_reconnect();
            }
        } else {
            debug!(%phase, "network lost");
            if phase.is_active() {
                self.stop_polling();
                self.transition(
                    SessionPhase::Error,
                    Some(SessionError::ConnectivityLost.to_string()),
                );
            }
        }
    }

    fn schedule_reconnect(&mut self) {
        if self
            .retry_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
        {
            debug!("reconnect already scheduled");
            return;
        }

        let attempts = self.attempts();
        if attempts >= self.config.max_reconnect_attempts {
            warn!(attempts, "reconnect attempts exhausted, forcing disconnect");
            self.transition(
                SessionPhase::Error,
                Some(SessionError::RetryExhausted.to_string()),
            );
            self.handle_disconnect();
            return;
        }

        let attempt = attempts + 1;
        self.set_attempts(attempt);
        info!(
            attempt,
            max = self.config.max_reconnect_attempts,
            delay_ms = self.config.reconnect_delay_ms,
            "scheduling reconnect"
        );

        let commands = self.commands.clone();
        let epoch = self.epoch;
        let delay = self.config.reconnect_delay();
        self.retry_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::RetryTick { epoch });
            }
        }));
    }

    fn handle_retry_tick(&mut self, epoch: u64) {
        self.retry_task = None;
        if epoch != self.epoch {
            debug!("discarding stale reconnect tick");
            return;
        }
        if !self.phase().is_error() {
            debug!(phase = %self.phase(), "reconnect tick outside error phase, ignoring");
            return;
        }
        let Some(credentials) = self.credentials.clone() else {
            warn!("no saved credentials to replay, abandoning reconnect");
            return;
        };

        info!(attempt = self.attempts(), "replaying saved credentials");
        self.transition(SessionPhase::Reconnecting, None);
        match self.parse_profile(&credentials) {
            Ok(profile) => self.start_session(profile, credentials),
            Err(e) => {
                // The saved config parsed when it was captured; failing
                // now ends the cycle as a plain error.
                error!(error = %e, "saved profile no longer parses");
                self.transition(SessionPhase::Error, Some(e.to_string()));
            }
        }
    }

    fn handle_poll_tick(&mut self, epoch: u64) {
        if epoch != self.epoch || self.phase() != SessionPhase::Connected {
            debug!("discarding stale stats tick");
            return;
        }
        let sample = lock_monitor(&self.monitor).sample();
        self.notify(StatusUpdate {
            phase: SessionPhase::Connected,
            message: None,
            network_stats: Some(sample),
        });
    }

    fn handle_set_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.observer = Some(observer);
        // Tell the new observer where things stand right away.
        let status = read_status(&self.status).clone();
        self.notify(StatusUpdate {
            phase: status.phase,
            message: status.last_error,
            network_stats: None,
        });
    }

    fn handle_shutdown(&mut self) {
        info!("session controller shutting down");
        self.handle_disconnect();
    }

    /// Parse the raw config and attach the caller's credentials.
    fn parse_profile(&self, credentials: &Credentials) -> Result<Profile, SessionError> {
        let mut profile = self
            .parser
            .parse(credentials.raw_config.as_bytes())
            .map_err(|e| SessionError::ConfigInvalid(e.to_string()))?;
        profile.username = Some(credentials.username.clone());
        profile.password = Some(credentials.password.clone());
        Ok(profile)
    }

    /// Shared tail of the manual connect and reconnect paths: save the
    /// credentials, arm the wake lock, start the engine.
    fn start_session(&mut self, profile: Profile, credentials: Credentials) {
        self.credentials = Some(credentials);
        self.acquire_wake_lock();
        match self.engine.start(&profile) {
            Ok(()) => self.transition(SessionPhase::Connecting, None),
            Err(e) => {
                error!(error = %e, "engine start failed");
                self.release_wake_lock();
                self.transition(
                    SessionPhase::Error,
                    Some(SessionError::Engine(e.to_string()).to_string()),
                );
            }
        }
    }

    /// Move the state machine, refresh the notification, and push the
    /// update to the observer. Transitions are emitted in order;
    /// observer failures are logged and swallowed.
    fn transition(&mut self, phase: SessionPhase, error: Option<String>) {
        {
            let mut status = write_status(&self.status);
            status.phase = phase;
            status.last_error = error.clone();
        }
        info!(%phase, "session phase changed");

        match NotificationContent::for_phase(phase, error.as_deref()) {
            Some(content) => {
                if let Err(e) = self.platform.notifier.show(&content) {
                    warn!(error = %e, "failed to update foreground notification");
                }
            }
            None => {
                if let Err(e) = self.platform.notifier.clear() {
                    warn!(error = %e, "failed to clear foreground notification");
                }
            }
        }

        self.notify(StatusUpdate {
            phase,
            message: error,
            network_stats: None,
        });
    }

    fn notify(&self, update: StatusUpdate) {
        if let Some(observer) = &self.observer {
            if let Err(e) = observer.deliver(update) {
                warn!(error = %e, "status observer delivery failed");
            }
        }
    }

    fn start_polling(&mut self) {
        self.stop_polling();
        let commands = self.commands.clone();
        let epoch = self.epoch;
        let interval = self.config.stats_interval();
        self.poll_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(commands) = commands.upgrade() else {
                    break;
                };
                if commands.send(Command::PollTick { epoch }).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop the stats poller. Bumps the epoch so ticks already queued
    /// in the mailbox are discarded.
    fn stop_polling(&mut self) {
        self.epoch += 1;
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    /// Cancel the poller and any pending reconnect before a new session
    /// (or teardown) proceeds.
    fn cancel_timers(&mut self) {
        self.stop_polling();
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
    }

    fn acquire_wake_lock(&mut self) {
        if self.wake_lock_held {
            return;
        }
        match self
            .platform
            .wake_lock
            .acquire(self.config.wake_lock_timeout())
        {
            Ok(()) => self.wake_lock_held = true,
            Err(e) => warn!(error = %e, "failed to acquire wake lock"),
        }
    }

    fn release_wake_lock(&mut self) {
        if !self.wake_lock_held {
            return;
        }
        self.wake_lock_held = false;
        if let Err(e) = self.platform.wake_lock.release() {
            warn!(error = %e, "failed to release wake lock");
        }
    }

    fn phase(&self) -> SessionPhase {
        read_status(&self.status).phase
    }

    fn attempts(&self) -> u32 {
        read_status(&self.status).reconnect_attempts
    }

    fn set_attempts(&self, attempts: u32) {
        write_status(&self.status).reconnect_attempts = attempts;
    }
}

fn read_status(lock: &RwLock<SessionStatus>) -> RwLockReadGuard<'_, SessionStatus> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_status(lock: &RwLock<SessionStatus>) -> RwLockWriteGuard<'_, SessionStatus> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_monitor(lock: &Mutex<TrafficMonitor>) -> MutexGuard<'_, TrafficMonitor> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
