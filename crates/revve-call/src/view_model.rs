//! Example binding of a [`CallCoordinator`] to observable UI state.
//!
//! The view-model owns no call logic. It forwards user intents to the
//! coordinator and folds lifecycle events and relayed transport events into a
//! [`CallViewState`] published on a `watch` channel.

use revve_types::{MediaDevice, TransportEvent, TransportState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coordinator::CallCoordinator;
use crate::error::CallError;
use crate::events::CallEvent;

/// How long an error toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

/// Shown when `connect` is called without an assistant id.
pub const MISSING_ASSISTANT_MESSAGE: &str =
    "Need to fill the assistantId. For more info visit: https://revve.ai";

/// Everything a call screen renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallViewState {
    pub status: TransportState,
    pub is_in_call: bool,
    pub is_bot_ready: bool,
    /// Seconds until the call expires, counted down once per second.
    pub timer_count: i64,
    pub is_mic_enabled: bool,
    pub local_audio_level: f32,
    pub remote_audio_level: f32,
    pub available_mics: Vec<MediaDevice>,
    pub selected_mic: Option<String>,
    pub toast_message: Option<String>,
    pub show_toast: bool,
}

#[derive(Default)]
struct Tasks {
    toast: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

struct ViewShared {
    state: watch::Sender<CallViewState>,
    tasks: Mutex<Tasks>,
}

/// Call screen state driven by a [`CallCoordinator`].
///
/// Must be created inside a Tokio runtime; it spawns a task that listens to
/// the coordinator's event channels for as long as the view-model lives.
pub struct CallViewModel {
    coordinator: CallCoordinator,
    shared: Arc<ViewShared>,
    pump: JoinHandle<()>,
}

impl CallViewModel {
    pub fn new(coordinator: CallCoordinator) -> Self {
        let (state, _) = watch::channel(CallViewState::default());
        let shared = Arc::new(ViewShared {
            state,
            tasks: Mutex::new(Tasks::default()),
        });
        let pump = tokio::spawn(pump_events(
            shared.clone(),
            coordinator.subscribe(),
            coordinator.transport_events(),
        ));
        Self {
            coordinator,
            shared,
            pump,
        }
    }

    pub fn coordinator(&self) -> &CallCoordinator {
        &self.coordinator
    }

    /// Subscribes to state updates.
    pub fn watch(&self) -> watch::Receiver<CallViewState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> CallViewState {
        self.shared.state.borrow().clone()
    }

    /// Starts a call with the trimmed `assistant_id`.
    ///
    /// Failures after the call was accepted reach the toast through the
    /// coordinator's failed event; rejections are toasted here.
    pub async fn connect(&self, assistant_id: &str) -> Result<(), CallError> {
        let assistant_id = assistant_id.trim();
        if assistant_id.is_empty() {
            self.show_error(MISSING_ASSISTANT_MESSAGE);
            return Err(CallError::InvalidAssistantId);
        }

        let result = self.coordinator.start(assistant_id, None).await;
        if let Err(err) = &result {
            if matches!(
                err,
                CallError::Busy { .. } | CallError::Closed | CallError::InvalidAssistantId
            ) {
                self.show_error(&err.to_string());
            }
        }
        result
    }

    pub async fn disconnect(&self) -> Result<(), CallError> {
        let result = self.coordinator.stop().await;
        if let Err(err) = &result {
            self.show_error(&err.to_string());
        }
        result
    }

    pub async fn toggle_mic(&self) {
        let enable = !self.shared.state.borrow().is_mic_enabled;
        match self.coordinator.set_microphone_enabled(enable).await {
            Ok(()) => self.shared.state.send_modify(|s| s.is_mic_enabled = enable),
            Err(err) => self.show_error(&err.to_string()),
        }
    }

    pub async fn select_mic(&self, device_id: &str) {
        self.shared
            .state
            .send_modify(|s| s.selected_mic = Some(device_id.to_string()));
        if let Err(err) = self.coordinator.select_microphone(device_id).await {
            self.show_error(&err.to_string());
        }
    }

    /// Shows `message` as a toast that hides itself after [`TOAST_DURATION`].
    pub fn show_error(&self, message: &str) {
        self.shared.show_error(message);
    }
}

impl Drop for CallViewModel {
    fn drop(&mut self) {
        self.pump.abort();
        let mut tasks = self.shared.lock_tasks();
        for task in [tasks.toast.take(), tasks.countdown.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl ViewShared {
    fn lock_tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn show_error(self: &Arc<Self>, message: &str) {
        self.state.send_modify(|s| {
            s.toast_message = Some(message.to_string());
            s.show_toast = true;
        });

        let shared = self.clone();
        let hide = tokio::spawn(async move {
            tokio::time::sleep(TOAST_DURATION).await;
            shared.state.send_modify(|s| {
                s.show_toast = false;
                s.toast_message = None;
            });
        });
        if let Some(previous) = self.lock_tasks().toast.replace(hide) {
            previous.abort();
        }
    }

    fn start_countdown(self: &Arc<Self>, expires_at: i64) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let remaining = (expires_at - now).max(0);
        self.state.send_modify(|s| s.timer_count = remaining);

        let shared = self.clone();
        let countdown = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let mut done = false;
                shared.state.send_modify(|s| {
                    s.timer_count = (s.timer_count - 1).max(0);
                    done = s.timer_count == 0;
                });
                if done {
                    break;
                }
            }
        });
        if let Some(previous) = self.lock_tasks().countdown.replace(countdown) {
            previous.abort();
        }
    }

    fn stop_countdown(&self) {
        if let Some(countdown) = self.lock_tasks().countdown.take() {
            countdown.abort();
        }
        self.state.send_modify(|s| s.timer_count = 0);
    }

    fn handle_call_event(self: &Arc<Self>, event: CallEvent) {
        match event {
            CallEvent::Started { session_id } => debug!(%session_id, "view: call started"),
            CallEvent::Ended { session_id } => {
                debug!(%session_id, "view: call ended");
                self.stop_countdown();
                self.state.send_modify(|s| {
                    s.is_in_call = false;
                    s.is_bot_ready = false;
                    s.local_audio_level = 0.0;
                    s.remote_audio_level = 0.0;
                });
            }
            CallEvent::Failed { error, .. } => self.show_error(&error.to_string()),
        }
    }

    fn handle_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::StateChanged { state } => self.state.send_modify(|s| {
                s.status = state;
                s.is_in_call = state.is_in_call();
            }),
            // Transports join with the microphone live.
            TransportEvent::Connected => self.state.send_modify(|s| s.is_mic_enabled = true),
            TransportEvent::Disconnected => {
                self.stop_countdown();
                self.state.send_modify(|s| s.is_bot_ready = false);
            }
            TransportEvent::BotReady { expires_at } => {
                self.state.send_modify(|s| s.is_bot_ready = true);
                if let Some(expires_at) = expires_at {
                    self.start_countdown(expires_at);
                }
            }
            TransportEvent::RemoteAudioLevel { level, .. } => {
                self.state.send_modify(|s| s.remote_audio_level = level)
            }
            TransportEvent::LocalAudioLevel { level } => {
                self.state.send_modify(|s| s.local_audio_level = level)
            }
            TransportEvent::UserTranscript(transcript) => {
                if transcript.is_final {
                    debug!(text = %transcript.text, "view: user transcript");
                }
            }
            TransportEvent::BotTranscript { text } => debug!(%text, "view: bot transcript"),
            TransportEvent::MicEnabled { enabled } => {
                self.state.send_modify(|s| s.is_mic_enabled = enabled)
            }
            TransportEvent::AvailableMicsUpdated { mics } => {
                self.state.send_modify(|s| s.available_mics = mics)
            }
            TransportEvent::MicUpdated { mic } => {
                self.state.send_modify(|s| s.selected_mic = mic.map(|m| m.id))
            }
            TransportEvent::Error { message } => self.show_error(&message),
        }
    }
}

async fn pump_events(
    shared: Arc<ViewShared>,
    mut calls: broadcast::Receiver<CallEvent>,
    mut transport: broadcast::Receiver<TransportEvent>,
) {
    loop {
        tokio::select! {
            event = calls.recv() => match event {
                Ok(event) => shared.handle_call_event(event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "view lagged behind call events"),
                Err(RecvError::Closed) => break,
            },
            event = transport.recv() => match event {
                Ok(event) => shared.handle_transport_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "view lagged behind transport events")
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
