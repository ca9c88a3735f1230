#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Router;
use revve_call::{
    AudioSession, AudioSessionConfig, AudioSessionError, CallCoordinator, CallError, CallEvent,
    CallRequest, CredentialSource, TransportError, TransportFactory, TransportSession,
};
use revve_types::{CallCredentials, CallState, ConnectionDetails, TransportEvent};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};

pub const ASSISTANT_ID: &str = "test-assistant-123";

pub const CONNECTION_DETAILS_JSON: &str = r#"{
    "server_url": "wss://test.livekit.cloud",
    "room_name": "test-room-123",
    "participant_token": "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.test",
    "participant_name": "test-participant"
}"#;

pub fn sample_details() -> ConnectionDetails {
    ConnectionDetails {
        server_url: "wss://test.livekit.cloud".to_string(),
        room_name: "test-room-123".to_string(),
        participant_token: "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.test".to_string(),
        participant_name: "test-participant".to_string(),
    }
}

// ── Audio session ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAudio {
    pub deny_permission: AtomicBool,
    pub fail_configure: AtomicBool,
    pub fail_deactivate: AtomicBool,
    pub permission_requests: AtomicUsize,
    pub configures: AtomicUsize,
    pub deactivations: AtomicUsize,
}

impl MockAudio {
    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSession for MockAudio {
    async fn request_record_permission(&self) -> bool {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        !self.deny_permission.load(Ordering::SeqCst)
    }

    fn configure(&self, _config: &AudioSessionConfig) -> Result<(), AudioSessionError> {
        self.configures.fetch_add(1, Ordering::SeqCst);
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(AudioSessionError("category not available".to_string()));
        }
        Ok(())
    }

    fn deactivate(&self) -> Result<(), AudioSessionError> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if self.fail_deactivate.load(Ordering::SeqCst) {
            return Err(AudioSessionError("session busy".to_string()));
        }
        Ok(())
    }
}

// ── Transport ───────────────────────────────────────────────────────

pub struct MockTransport {
    pub events: broadcast::Sender<TransportEvent>,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub mic_enabled: AtomicBool,
    pub selected_mic: Mutex<Option<String>>,
    connect_failure: Option<TransportError>,
    fail_disconnect: bool,
    gate: Option<Arc<Notify>>,
}

impl MockTransport {
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportSession for MockTransport {
    async fn connect(&self, _credentials: &CallCredentials) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.connect_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(TransportError::Disconnect("socket already closed".to_string()));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.mic_enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn select_microphone(&self, device_id: &str) -> Result<(), TransportError> {
        *self.selected_mic.lock().unwrap() = Some(device_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockTransportFactory {
    pub created: Mutex<Vec<Arc<MockTransport>>>,
    pub connect_failure: Mutex<Option<TransportError>>,
    pub fail_disconnect: AtomicBool,
    pub gate: Mutex<Option<Arc<Notify>>>,
}

impl MockTransportFactory {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transport created")
    }

    /// Holds every subsequent connect until the returned handle is notified.
    pub fn hold_connect(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

impl TransportFactory for MockTransportFactory {
    fn create(
        &self,
        _credentials: &CallCredentials,
    ) -> Result<Arc<dyn TransportSession>, TransportError> {
        let (events, _) = broadcast::channel(16);
        let transport = Arc::new(MockTransport {
            events,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            mic_enabled: AtomicBool::new(true),
            selected_mic: Mutex::new(None),
            connect_failure: self.connect_failure.lock().unwrap().clone(),
            fail_disconnect: self.fail_disconnect.load(Ordering::SeqCst),
            gate: self.gate.lock().unwrap().clone(),
        });
        self.created.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

// ── Credentials ─────────────────────────────────────────────────────

pub struct MockCredentials {
    pub requests: Mutex<Vec<CallRequest>>,
    pub result: Mutex<Result<CallCredentials, CallError>>,
}

impl Default for MockCredentials {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            result: Mutex::new(Ok(CallCredentials::Room(sample_details()))),
        }
    }
}

impl MockCredentials {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn fail_with(&self, err: CallError) {
        *self.result.lock().unwrap() = Err(err);
    }

    pub fn succeed(&self) {
        *self.result.lock().unwrap() = Ok(CallCredentials::Room(sample_details()));
    }
}

#[async_trait]
impl CredentialSource for MockCredentials {
    async fn credentials(&self, request: &CallRequest) -> Result<CallCredentials, CallError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.lock().unwrap().clone()
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub coordinator: CallCoordinator,
    pub audio: Arc<MockAudio>,
    pub transports: Arc<MockTransportFactory>,
    pub credentials: Arc<MockCredentials>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_max_duration(None)
    }

    pub fn with_max_duration(max: Option<Duration>) -> Self {
        let audio = Arc::new(MockAudio::default());
        let transports = Arc::new(MockTransportFactory::default());
        let credentials = Arc::new(MockCredentials::default());
        let coordinator =
            CallCoordinator::builder(credentials.clone(), audio.clone(), transports.clone())
                .max_call_duration(max)
                .build();
        Self {
            coordinator,
            audio,
            transports,
            credentials,
        }
    }

    /// Uses a real credential source instead of the mock.
    pub fn with_source(source: Arc<dyn CredentialSource>) -> Self {
        let audio = Arc::new(MockAudio::default());
        let transports = Arc::new(MockTransportFactory::default());
        let coordinator = CallCoordinator::new(source, audio.clone(), transports.clone());
        Self {
            coordinator,
            audio,
            transports,
            credentials: Arc::new(MockCredentials::default()),
        }
    }
}

pub fn drain(rx: &mut broadcast::Receiver<CallEvent>) -> Vec<CallEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub async fn wait_for_state(coordinator: &CallCoordinator, state: CallState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.state() != state {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("coordinator never reached {state}"));
}

// ── Mock API server ─────────────────────────────────────────────────

/// Starts an HTTP server answering every request with `status` and `body`.
pub async fn mock_api(status: u16, body: &'static str) -> String {
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new().fallback(move || async move { (status, body) });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
