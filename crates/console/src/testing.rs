//! Scripted [`AdminApi`] for tests and offline demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use crate::api::{AdminApi, ApiError};
use crate::types::{LoginEnvelope, LoginRequest, PermissionsEnvelope};

/// Holds a scripted call open until released.
#[derive(Debug, Clone)]
pub struct Gate {
    open: Arc<watch::Sender<bool>>,
}

impl Gate {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { open: Arc::new(tx) }, rx)
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }
}

#[derive(Default)]
struct Script {
    logins: VecDeque<Result<LoginEnvelope, ApiError>>,
    permissions: VecDeque<Result<PermissionsEnvelope, ApiError>>,
    logout_error: Option<ApiError>,
    logged_out: Vec<String>,
    login_gate: Option<watch::Receiver<bool>>,
    logout_gate: Option<watch::Receiver<bool>>,
    permission_gate: Option<watch::Receiver<bool>>,
}

/// An [`AdminApi`] answering from queued responses.
///
/// An empty queue answers with a network error.
#[derive(Default)]
pub struct FakeApi {
    script: Mutex<Script>,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    permission_calls: AtomicUsize,
    login_called: Notify,
    logout_called: Notify,
    permission_called: Notify,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_login(&self, response: Result<LoginEnvelope, ApiError>) {
        self.script().logins.push_back(response);
    }

    pub fn push_permissions(&self, response: Result<PermissionsEnvelope, ApiError>) {
        self.script().permissions.push_back(response);
    }

    pub fn fail_logout(&self, error: ApiError) {
        self.script().logout_error = Some(error);
    }

    /// Block login calls until the returned gate is released.
    pub fn hold_login(&self) -> Gate {
        let (gate, rx) = Gate::new();
        self.script().login_gate = Some(rx);
        gate
    }

    /// Block logout calls until the returned gate is released.
    pub fn hold_logout(&self) -> Gate {
        let (gate, rx) = Gate::new();
        self.script().logout_gate = Some(rx);
        gate
    }

    /// Block permission fetches until the returned gate is released.
    pub fn hold_permissions(&self) -> Gate {
        let (gate, rx) = Gate::new();
        self.script().permission_gate = Some(rx);
        gate
    }

    pub async fn wait_for_login_call(&self) {
        self.login_called.notified().await;
    }

    pub async fn wait_for_logout_call(&self) {
        self.logout_called.notified().await;
    }

    pub async fn wait_for_permission_call(&self) {
        self.permission_called.notified().await;
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn permission_calls(&self) -> usize {
        self.permission_calls.load(Ordering::SeqCst)
    }

    /// Tokens passed to `logout`, in call order.
    pub fn logged_out_tokens(&self) -> Vec<String> {
        self.script().logged_out.clone()
    }
}

fn unscripted() -> ApiError {
    ApiError::Network("no scripted response".to_string())
}

async fn pass(gate: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = gate {
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl AdminApi for FakeApi {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginEnvelope, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_called.notify_one();

        let gate = self.script().login_gate.clone();
        pass(gate).await;

        self.script().logins.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_called.notify_one();

        let gate = self.script().logout_gate.clone();
        pass(gate).await;

        let mut script = self.script();
        script.logged_out.push(token.to_string());
        match script.logout_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_permissions(&self, _token: &str) -> Result<PermissionsEnvelope, ApiError> {
        self.permission_calls.fetch_add(1, Ordering::SeqCst);
        self.permission_called.notify_one();

        let gate = self.script().permission_gate.clone();
        pass(gate).await;

        self.script()
            .permissions
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()))
    }
}
