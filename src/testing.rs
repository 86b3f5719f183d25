// src/testing.rs
//! In-memory collaborators for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::core::listeners::{ListenerRegistry, Subscription};
use crate::core::service_client::{MatchBackend, RegistrationAck};
use crate::error::ClientError;
use crate::session::{
    AuthEvent, AuthEventKind, AuthListener, IdentityProvider, Session, SignUpOutcome,
};
use crate::types::{JobPayload, MatchResult, UploadResponse};

pub(crate) struct FakeIdentity {
    session: Mutex<Option<Session>>,
    listeners: Arc<ListenerRegistry<AuthEvent>>,
    get_session_calls: AtomicUsize,
}

impl FakeIdentity {
    pub(crate) fn with_session(session: Option<Session>) -> Self {
        Self {
            session: Mutex::new(session),
            listeners: ListenerRegistry::new(),
            get_session_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn signed_in(token: &str) -> Self {
        Self::with_session(Some(Session::new(token)))
    }

    pub(crate) fn anonymous() -> Self {
        Self::with_session(None)
    }

    /// Change the stored session without notifying anyone.
    pub(crate) fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub(crate) fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        self.set_session(session.clone());
        self.listeners.emit(&AuthEvent::new(kind, session));
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn get_session_calls(&self) -> usize {
        self.get_session_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_session(&self) -> Result<Option<Session>, ClientError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().unwrap().clone())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.subscribe(move |event| listener(event))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        if password == "wrong" {
            return Err(ClientError::Identity("Invalid login credentials".to_string()));
        }
        let session = Session::new(format!("token-for-{}", email)).with_email(email);
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError> {
        if email.starts_with("confirm") {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        self.sign_in_with_password(email, password)
            .await
            .map(SignUpOutcome::SignedIn)
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Upload {
        token: String,
        file_name: String,
        size: usize,
    },
    Register {
        token: String,
        payload: JobPayload,
    },
    Match {
        token: String,
        job_id: String,
    },
}

type MatchOutcome = Result<Vec<MatchResult>, ClientError>;
type UploadOutcome = Result<UploadResponse, ClientError>;
type RegisterOutcome = Result<RegistrationAck, ClientError>;

/// Records every call; answers are scripted per endpoint.
pub(crate) struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    upload: Mutex<Result<UploadResponse, ClientError>>,
    register: Mutex<Result<RegistrationAck, ClientError>>,
    matches: Mutex<HashMap<String, MatchOutcome>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<MatchOutcome>>>,
    upload_gate: Mutex<Option<oneshot::Receiver<UploadOutcome>>>,
    register_gate: Mutex<Option<oneshot::Receiver<RegisterOutcome>>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            upload: Mutex::new(Ok(UploadResponse::default())),
            register: Mutex::new(Ok(RegistrationAck {
                status: 200,
                detail: None,
            })),
            matches: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            upload_gate: Mutex::new(None),
            register_gate: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn set_upload(&self, outcome: Result<UploadResponse, ClientError>) {
        *self.upload.lock().unwrap() = outcome;
    }

    pub(crate) fn set_register(&self, outcome: Result<RegistrationAck, ClientError>) {
        *self.register.lock().unwrap() = outcome;
    }

    pub(crate) fn set_match(&self, job_id: &str, outcome: MatchOutcome) {
        self.matches
            .lock()
            .unwrap()
            .insert(job_id.to_string(), outcome);
    }

    /// The next match call for `job_id` stays pending until the sender fires.
    pub(crate) fn gate_match(&self, job_id: &str) -> oneshot::Sender<MatchOutcome> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(job_id.to_string(), rx);
        tx
    }

    /// The next upload stays pending until the sender fires.
    pub(crate) fn gate_upload(&self) -> oneshot::Sender<UploadOutcome> {
        let (tx, rx) = oneshot::channel();
        *self.upload_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The next job registration stays pending until the sender fires.
    pub(crate) fn gate_register(&self) -> oneshot::Sender<RegisterOutcome> {
        let (tx, rx) = oneshot::channel();
        *self.register_gate.lock().unwrap() = Some(rx);
        tx
    }
}

#[async_trait]
impl MatchBackend for FakeBackend {
    async fn upload_resume(
        &self,
        token: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        self.calls.lock().unwrap().push(Call::Upload {
            token: token.to_string(),
            file_name: file_name.to_string(),
            size: content.len(),
        });
        let gate = self.upload_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".to_string())));
        }
        self.upload.lock().unwrap().clone()
    }

    async fn register_job(
        &self,
        token: &str,
        payload: &JobPayload,
    ) -> Result<RegistrationAck, ClientError> {
        self.calls.lock().unwrap().push(Call::Register {
            token: token.to_string(),
            payload: payload.clone(),
        });
        let gate = self.register_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".to_string())));
        }
        self.register.lock().unwrap().clone()
    }

    async fn match_resumes(&self, token: &str, job_id: &str) -> MatchOutcome {
        self.calls.lock().unwrap().push(Call::Match {
            token: token.to_string(),
            job_id: job_id.to_string(),
        });

        let gate = self.gates.lock().unwrap().remove(job_id);
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".to_string())));
        }

        self.matches
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub(crate) fn result(filename: &str, score: f64) -> MatchResult {
    MatchResult {
        filename: Some(filename.to_string()),
        match_score: Some(score),
        ..Default::default()
    }
}
