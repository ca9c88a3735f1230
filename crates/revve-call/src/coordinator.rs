//! Call session coordinator.
//!
//! Owns the lifecycle of one call at a time:
//!
//! ```text
//! Idle → AcquiringPermission → ConfiguringAudio → FetchingCredentials
//!      → Connecting → Active → Disconnecting → Idle
//! ```
//!
//! Any failure before `Active` tears down whatever was set up and returns to
//! `Idle`. Teardown never fails: errors from the transport or the audio
//! session are logged and the sequence continues.
//!
//! The coordinator exclusively owns the platform audio session and the
//! transport session handle while a call is in progress.

use revve_api::Metadata;
use revve_types::{CallState, TransportEvent};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::SdkConfig;
use crate::credentials::{CallRequest, CredentialSource};
use crate::error::CallError;
use crate::events::CallEvent;
use crate::platform::{AudioSession, AudioSessionConfig};
use crate::transport::{TransportFactory, TransportSession};

/// Default capacity for the lifecycle event broadcast channel.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Default capacity for the relayed transport event broadcast channel.
const DEFAULT_TRANSPORT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct CallSession {
    id: Uuid,
    request: CallRequest,
}

#[derive(Default)]
struct Inner {
    state: CallState,
    session: Option<CallSession>,
    transport: Option<Arc<dyn TransportSession>>,
    relay: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
    audio_active: bool,
    closed: bool,
}

struct Shared {
    credentials: Arc<dyn CredentialSource>,
    audio: Arc<dyn AudioSession>,
    transports: Arc<dyn TransportFactory>,
    audio_config: AudioSessionConfig,
    max_call_duration: Option<Duration>,
    events: broadcast::Sender<CallEvent>,
    transport_events: broadcast::Sender<TransportEvent>,
    inner: Mutex<Inner>,
}

/// Coordinates permission, audio routing, credentials and transport for
/// voice calls with an assistant.
///
/// Cloning yields another handle to the same coordinator. Call
/// [`close`](Self::close) before discarding the last handle; dropping it
/// with a call in progress only schedules a best-effort teardown.
#[derive(Clone)]
pub struct CallCoordinator {
    shared: Arc<Shared>,
}

/// Builder for [`CallCoordinator`].
pub struct CallCoordinatorBuilder {
    credentials: Arc<dyn CredentialSource>,
    audio: Arc<dyn AudioSession>,
    transports: Arc<dyn TransportFactory>,
    audio_config: AudioSessionConfig,
    max_call_duration: Option<Duration>,
    event_capacity: usize,
}

impl CallCoordinatorBuilder {
    pub fn audio_config(mut self, config: AudioSessionConfig) -> Self {
        self.audio_config = config;
        self
    }

    /// Ends calls automatically once they have been active this long.
    pub fn max_call_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_call_duration = duration;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> CallCoordinator {
        let (events, _) = broadcast::channel(self.event_capacity);
        let (transport_events, _) = broadcast::channel(DEFAULT_TRANSPORT_EVENT_CAPACITY);
        CallCoordinator {
            shared: Arc::new(Shared {
                credentials: self.credentials,
                audio: self.audio,
                transports: self.transports,
                audio_config: self.audio_config,
                max_call_duration: self.max_call_duration,
                events,
                transport_events,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }
}

impl CallCoordinator {
    pub fn builder(
        credentials: Arc<dyn CredentialSource>,
        audio: Arc<dyn AudioSession>,
        transports: Arc<dyn TransportFactory>,
    ) -> CallCoordinatorBuilder {
        CallCoordinatorBuilder {
            credentials,
            audio,
            transports,
            audio_config: AudioSessionConfig::default(),
            max_call_duration: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        audio: Arc<dyn AudioSession>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self::builder(credentials, audio, transports).build()
    }

    /// Builds a coordinator with the credential strategy and call settings
    /// described by `config`.
    pub fn from_config(
        config: &SdkConfig,
        audio: Arc<dyn AudioSession>,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self, CallError> {
        Ok(Self::builder(config.credential_source()?, audio, transports)
            .max_call_duration(config.call.max_duration())
            .build())
    }

    pub fn state(&self) -> CallState {
        self.shared.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == CallState::Active
    }

    /// Subscribes to call started / ended / failed notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.shared.events.subscribe()
    }

    /// Subscribes to native events of whichever transport is active.
    ///
    /// The subscription outlives individual calls.
    pub fn transport_events(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.transport_events.subscribe()
    }

    /// Starts a call with `assistant_id`.
    ///
    /// Resolves once the transport has connected or the attempt has failed
    /// and been torn down.
    ///
    /// # Errors
    ///
    /// Fails immediately with [`CallError::Busy`] if a call is active or
    /// starting, and with [`CallError::PermissionDenied`] if the user refuses
    /// microphone access. Credential and transport failures are returned
    /// unchanged.
    pub async fn start(
        &self,
        assistant_id: &str,
        metadata: Option<Metadata>,
    ) -> Result<(), CallError> {
        let session = self.shared.begin(assistant_id, metadata)?;
        let span = info_span!(
            "call",
            session_id = %session.id,
            assistant_id = %session.request.assistant_id
        );
        self.shared.run_start(session).instrument(span).await
    }

    /// Ends the active call.
    ///
    /// Transport disconnect errors are logged, not returned.
    ///
    /// # Errors
    ///
    /// [`CallError::NoActiveCall`] when idle; [`CallError::Busy`] while a
    /// start or another stop is still in flight.
    pub async fn stop(&self) -> Result<(), CallError> {
        self.shared.stop(None).await
    }

    /// Tears down any active or starting call and rejects further starts.
    ///
    /// An in-flight `start` resolves with [`CallError::Cancelled`].
    pub async fn close(&self) {
        let active = {
            let mut inner = self.shared.lock();
            inner.closed = true;
            if inner.state == CallState::Active {
                inner.session.as_ref().map(|session| session.id)
            } else {
                None
            }
        };

        self.shared.teardown().await;

        if let Some(session_id) = active {
            info!(%session_id, "call ended by close");
            self.shared.emit(CallEvent::Ended { session_id });
        }
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), CallError> {
        let transport = self.shared.active_transport()?;
        transport.set_microphone_enabled(enabled).await?;
        Ok(())
    }

    pub async fn select_microphone(&self, device_id: &str) -> Result<(), CallError> {
        let transport = self.shared.active_transport()?;
        transport.select_microphone(device_id).await?;
        Ok(())
    }
}

impl fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("CallCoordinator")
            .field("state", &inner.state)
            .field("session_id", &inner.session.as_ref().map(|s| s.id))
            .field("closed", &inner.closed)
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CallEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Claims the coordinator for a new session. Never suspends.
    fn begin(
        &self,
        assistant_id: &str,
        metadata: Option<Metadata>,
    ) -> Result<CallSession, CallError> {
        if assistant_id.trim().is_empty() {
            return Err(CallError::InvalidAssistantId);
        }

        let mut inner = self.lock();
        if inner.closed {
            return Err(CallError::Closed);
        }
        if inner.state != CallState::Idle {
            debug!(state = %inner.state, "rejecting start while busy");
            return Err(CallError::Busy { state: inner.state });
        }

        let session = CallSession {
            id: Uuid::new_v4(),
            request: CallRequest {
                assistant_id: assistant_id.to_string(),
                metadata,
            },
        };
        inner.state = CallState::AcquiringPermission;
        inner.session = Some(session.clone());
        Ok(session)
    }

    /// Applies `f` if `session` is still the current one.
    ///
    /// Fails with [`CallError::Cancelled`] once a teardown has released it.
    fn update(&self, session: &CallSession, f: impl FnOnce(&mut Inner)) -> Result<(), CallError> {
        let mut inner = self.lock();
        if inner.session.as_ref().map(|s| s.id) != Some(session.id) {
            return Err(CallError::Cancelled);
        }
        let from = inner.state;
        f(&mut inner);
        if from != inner.state {
            debug!(from = %from, to = %inner.state, "call state transition");
        }
        Ok(())
    }

    /// Releases `session` without side effects.
    fn abandon(&self, session: &CallSession) {
        let mut inner = self.lock();
        if inner.session.as_ref().map(|s| s.id) == Some(session.id) {
            inner.session = None;
            inner.state = CallState::Idle;
        }
    }

    async fn run_start(self: &Arc<Self>, session: CallSession) -> Result<(), CallError> {
        if !self.audio.request_record_permission().await {
            warn!("microphone permission denied");
            self.abandon(&session);
            let err = CallError::PermissionDenied;
            self.emit(CallEvent::Failed {
                session_id: session.id,
                error: err.clone(),
            });
            return Err(err);
        }

        match self.establish(&session).await {
            Ok(()) => {
                info!("call started");
                self.emit(CallEvent::Started {
                    session_id: session.id,
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "call failed to start");
                self.teardown().await;
                self.emit(CallEvent::Failed {
                    session_id: session.id,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    async fn establish(self: &Arc<Self>, session: &CallSession) -> Result<(), CallError> {
        self.update(session, |inner| {
            inner.state = CallState::ConfiguringAudio;
            inner.audio_active = true;
        })?;
        // Degraded routing is better than refusing the call.
        if let Err(e) = self.audio.configure(&self.audio_config) {
            warn!(error = %e, "failed to configure audio session, continuing");
        }

        self.update(session, |inner| inner.state = CallState::FetchingCredentials)?;
        let credentials = self.credentials.credentials(&session.request).await?;

        let transport = self.transports.create(&credentials)?;
        let relay = spawn_relay(transport.subscribe(), self.transport_events.clone());
        let relay_abort = relay.abort_handle();
        let stored = self.update(session, |inner| {
            inner.state = CallState::Connecting;
            inner.transport = Some(transport.clone());
            inner.relay = Some(relay);
        });
        if let Err(err) = stored {
            // Released before it was stored; nothing else will disconnect it.
            relay_abort.abort();
            if let Err(e) = transport.disconnect().await {
                warn!(error = %e, "transport disconnect failed after cancellation");
            }
            return Err(err);
        }

        transport.connect(&credentials).await?;
        drop(credentials);

        let shared = Arc::downgrade(self);
        let max_call_duration = self.max_call_duration;
        self.update(session, |inner| {
            inner.state = CallState::Active;
            inner.timer = max_call_duration
                .map(|duration| spawn_session_timer(shared, session.id, duration));
        })
    }

    async fn stop(&self, expected: Option<Uuid>) -> Result<(), CallError> {
        let (session_id, transport) = {
            let mut inner = self.lock();
            match inner.state {
                CallState::Idle => return Err(CallError::NoActiveCall),
                CallState::Active => {}
                state => return Err(CallError::Busy { state }),
            }
            let Some(session_id) = inner.session.as_ref().map(|s| s.id) else {
                return Err(CallError::NoActiveCall);
            };
            if expected.is_some_and(|id| id != session_id) {
                return Err(CallError::NoActiveCall);
            }
            inner.state = CallState::Disconnecting;
            (session_id, inner.transport.take())
        };

        if let Some(transport) = transport {
            if let Err(e) = transport.disconnect().await {
                warn!(%session_id, error = %e, "transport disconnect failed, continuing teardown");
            }
        }

        self.teardown().await;

        info!(%session_id, "call ended");
        self.emit(CallEvent::Ended { session_id });
        Ok(())
    }

    /// Ends the call when the session timer fires.
    async fn expire(&self, session_id: Uuid) {
        {
            let mut inner = self.lock();
            if inner.state != CallState::Active
                || inner.session.as_ref().map(|s| s.id) != Some(session_id)
            {
                return;
            }
            // Detach so stop does not abort the task running it.
            inner.timer.take();
        }

        if let Err(e) = self.stop(Some(session_id)).await {
            debug!(%session_id, error = %e, "session timer found no call to end");
        }
    }

    /// Idempotent; always leaves the coordinator idle.
    async fn teardown(&self) {
        let (transport, tasks, audio_active) = {
            let mut inner = self.lock();
            inner.session = None;
            if inner.state != CallState::Idle {
                inner.state = CallState::Disconnecting;
            }
            (
                inner.transport.take(),
                [inner.relay.take(), inner.timer.take()],
                std::mem::take(&mut inner.audio_active),
            )
        };

        // A transport still referenced elsewhere must not leak into the next call.
        for task in tasks.into_iter().flatten() {
            task.abort();
        }

        if let Some(transport) = transport {
            if let Err(e) = transport.disconnect().await {
                warn!(error = %e, "transport disconnect failed during teardown");
            }
        }

        if audio_active {
            if let Err(e) = self.audio.deactivate() {
                warn!(error = %e, "failed to deactivate audio session");
            }
        }

        let mut inner = self.lock();
        if inner.session.is_none() {
            inner.state = CallState::Idle;
        }
    }

    fn active_transport(&self) -> Result<Arc<dyn TransportSession>, CallError> {
        let inner = self.lock();
        if inner.state != CallState::Active {
            return Err(CallError::NoActiveCall);
        }
        inner.transport.clone().ok_or(CallError::NoActiveCall)
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in [inner.relay.take(), inner.timer.take()].into_iter().flatten() {
            task.abort();
        }
        let transport = inner.transport.take();
        let audio_active = std::mem::take(&mut inner.audio_active);
        if transport.is_none() && !audio_active {
            return;
        }

        warn!("call coordinator dropped with a call in progress, scheduling teardown");
        let audio = self.audio.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(transport) = transport {
                        if let Err(e) = transport.disconnect().await {
                            warn!(error = %e, "transport disconnect failed during drop");
                        }
                    }
                    if audio_active {
                        if let Err(e) = audio.deactivate() {
                            warn!(error = %e, "failed to deactivate audio session");
                        }
                    }
                });
            }
            Err(_) => {
                warn!("no async runtime available, transport released without disconnect");
                if audio_active {
                    if let Err(e) = audio.deactivate() {
                        warn!(error = %e, "failed to deactivate audio session");
                    }
                }
            }
        }
    }
}

/// Forwards a transport's native events until its channel closes or the
/// call is torn down.
fn spawn_relay(
    mut native: broadcast::Receiver<TransportEvent>,
    relay: broadcast::Sender<TransportEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match native.recv().await {
                Ok(event) => {
                    let _ = relay.send(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "transport event relay lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn spawn_session_timer(
    shared: Weak<Shared>,
    session_id: Uuid,
    duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        info!(
            %session_id,
            seconds = duration.as_secs(),
            "maximum call duration reached, ending call"
        );
        shared.expire(session_id).await;
    })
}
