use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    Error,
    alert::{Alert, Notifier},
    backend::{ApiRequest, ApiResponse, Backend},
    config::CoordinatorConfig,
    coordinator::Coordinator,
    tokens::MemoryTokenStore,
};

type Script = dyn Fn(usize, &ApiRequest) -> (Duration, Result<ApiResponse, Error>) + Send + Sync;

/// A [Backend] that answers each call from a script and records what it was
/// sent.
///
/// The script receives the zero based call index and the request, and returns
/// how long to wait before answering and the answer.
pub(crate) struct ScriptedBackend {
    calls: AtomicUsize,
    requests: Mutex<Vec<ApiRequest>>,
    script: Box<Script>,
}

impl ScriptedBackend {
    pub(crate) fn new(
        script: impl Fn(usize, &ApiRequest) -> (Duration, Result<ApiResponse, Error>)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            script: Box::new(script),
        }
    }

    /// A backend that immediately answers every call with `response`.
    pub(crate) fn always(response: ApiResponse) -> Self {
        Self::new(move |_, _| (Duration::ZERO, Ok(response.clone())))
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let (delay, result) = (self.script)(call, &request);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        result
    }
}

/// A [Notifier] that remembers every alert and redirect.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
    redirects: AtomicUsize,
}

impl RecordingNotifier {
    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn redirect_count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }

    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// A coordinator using `backend` with default settings and a stored token.
pub(crate) fn coordinator_with(
    backend: Arc<dyn Backend>,
) -> (Coordinator, Arc<RecordingNotifier>, Arc<MemoryTokenStore>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = Arc::new(MemoryTokenStore::with_auth_token("test-token"));

    let coordinator = Coordinator::new(
        backend,
        tokens.clone(),
        notifier.clone(),
        CoordinatorConfig::default(),
    );

    (coordinator, notifier, tokens)
}
