// src/session.rs
//! Session ownership: the identity provider capability and the guard that
//! gates every authenticated call.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::core::listeners::{ListenerRegistry, Subscription};
use crate::error::ClientError;

/// Proof of authentication. `present = false` means anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub present: bool,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let claims = read_claims(&token);
        Self {
            expires_at: claims.as_ref().and_then(|c| c.exp).and_then(timestamp),
            email: claims.and_then(|c| c.email),
            token,
            present: true,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn is_valid(&self) -> bool {
        self.present && !self.token.is_empty() && !self.is_expired_at(Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
    email: Option<String>,
}

/// Read `exp` and `email` without verifying the signature; verification is
/// the backend's job, the client only needs to know when to refresh.
fn read_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The provider signed the new user in straight away.
    SignedIn(Session),
    /// The account exists but the e-mail address must be confirmed first.
    ConfirmationRequired,
}

pub type AuthListener = Box<dyn Fn(&AuthEvent) + Send + Sync>;

/// Identity provider capability. Transport and token storage are the
/// implementor's concern.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshing it first when the provider can.
    async fn get_session(&self) -> Result<Option<Session>, ClientError>;

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(session) if session.present => Self::Authenticated(session),
            _ => Self::Anonymous,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

struct GuardInner {
    state: Mutex<SessionState>,
    listeners: Arc<ListenerRegistry<SessionState>>,
}

impl GuardInner {
    fn state(&self) -> SessionState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transition(&self, next: SessionState) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == next {
                return;
            }
            debug!(
                from = state_name(&state),
                to = state_name(&next),
                "Session transition"
            );
            *state = next.clone();
        }
        self.listeners.emit(&next);
    }

    /// Apply the initial `get_session` answer unless a provider event got there first.
    fn settle(&self, initial: SessionState) {
        let applied = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.is_loading() {
                *state = initial.clone();
                true
            } else {
                false
            }
        };
        if applied {
            self.listeners.emit(&initial);
        }
    }
}

fn state_name(state: &SessionState) -> &'static str {
    match state {
        SessionState::Loading => "loading",
        SessionState::Authenticated(_) => "authenticated",
        SessionState::Anonymous => "anonymous",
    }
}

/// Owns the authentication state for one mounted client.
pub struct SessionGuard {
    provider: Arc<dyn IdentityProvider>,
    inner: Arc<GuardInner>,
    provider_subscription: Mutex<Option<Subscription>>,
}

impl SessionGuard {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            inner: Arc::new(GuardInner {
                state: Mutex::new(SessionState::Loading),
                listeners: ListenerRegistry::new(),
            }),
            provider_subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the provider, then resolve the initial session.
    ///
    /// A provider failure here settles to `Anonymous` rather than leaving the
    /// guard in `Loading`.
    pub async fn start(&self) -> SessionState {
        {
            let mut slot = self
                .provider_subscription
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                let inner: Weak<GuardInner> = Arc::downgrade(&self.inner);
                *slot = Some(self.provider.on_auth_state_change(Box::new(move |event| {
                    if let Some(inner) = inner.upgrade() {
                        debug!(kind = ?event.kind, "Identity provider event");
                        inner.transition(SessionState::from_session(event.session.clone()));
                    }
                })));
            }
        }

        let initial = match self.provider.get_session().await {
            Ok(session) => SessionState::from_session(session),
            Err(e) => {
                warn!("Could not resolve initial session: {}", e);
                SessionState::Anonymous
            }
        };
        self.inner.settle(initial);
        self.state()
    }

    /// Release the provider subscription. Safe to call more than once.
    pub fn teardown(&self) {
        let subscription = self
            .provider_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            debug!("Session guard detached from identity provider");
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    pub fn current_session(&self) -> Session {
        match self.state() {
            SessionState::Authenticated(session) => session,
            _ => Session::anonymous(),
        }
    }

    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    pub fn require_token(&self) -> Result<String, ClientError> {
        let session = self.current_session();
        if session.is_valid() {
            Ok(session.token)
        } else {
            Err(ClientError::Unauthenticated)
        }
    }

    /// Like `require_token`, but lets the provider refresh an expired token first.
    pub async fn fresh_token(&self) -> Result<String, ClientError> {
        if let Ok(token) = self.require_token() {
            return Ok(token);
        }
        if self.is_loading() {
            return Err(ClientError::Unauthenticated);
        }

        let session = self.provider.get_session().await?;
        match session {
            Some(session) if session.is_valid() => {
                let token = session.token.clone();
                self.inner.transition(SessionState::Authenticated(session));
                Ok(token)
            }
            _ => {
                self.inner.transition(SessionState::Anonymous);
                Err(ClientError::Unauthenticated)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        info!("Signed in as {}", session.email.as_deref().unwrap_or(email));
        self.inner
            .transition(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError> {
        let outcome = self.provider.sign_up(email, password).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.inner
                .transition(SessionState::Authenticated(session.clone()));
        }
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = self.provider.sign_out().await;
        self.inner.transition(SessionState::Anonymous);
        result
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.teardown();
    }
}
