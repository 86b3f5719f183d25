// src/core/identity_client.rs
//! Supabase (GoTrue) password-auth adapter for the identity provider capability

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::listeners::{ListenerRegistry, Subscription};
use super::session_store::{SessionStore, StoredSession};
use crate::error::ClientError;
use crate::session::{AuthEvent, AuthEventKind, AuthListener, IdentityProvider, Session, SignUpOutcome};

const PASSWORD_GRANT_ENDPOINT: &str = "/auth/v1/token?grant_type=password";
const REFRESH_GRANT_ENDPOINT: &str = "/auth/v1/token?grant_type=refresh_token";
const SIGNUP_ENDPOINT: &str = "/auth/v1/signup";
const LOGOUT_ENDPOINT: &str = "/auth/v1/logout";

/// Refresh this long before the access token actually expires.
const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    email: Option<String>,
}

impl TokenResponse {
    fn into_stored(self) -> StoredSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + Duration::seconds(secs))
            });

        StoredSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            email: self.user.and_then(|user| user.email),
        }
    }
}

pub struct SupabaseAuth {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    current: Mutex<Option<StoredSession>>,
    loaded: AtomicBool,
    store: Option<SessionStore>,
    listeners: Arc<ListenerRegistry<AuthEvent>>,
}

impl SupabaseAuth {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: crate::config::trim_base_url(base_url),
            anon_key: anon_key.to_string(),
            current: Mutex::new(None),
            loaded: AtomicBool::new(false),
            store: None,
            listeners: ListenerRegistry::new(),
        })
    }

    /// Keep the session across process restarts.
    pub fn with_store(mut self, store: SessionStore) -> Self {
        self.store = Some(store);
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn post_grant(&self, endpoint: &str, body: serde_json::Value) -> Result<TokenResponse, ClientError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Identity(auth_error_message(&text, status.as_u16())));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ClientError::Decode(format!("Failed to parse token response: {}", e)))
    }

    async fn persist(&self, stored: Option<&StoredSession>) {
        let Some(store) = &self.store else {
            return;
        };
        let result = match stored {
            Some(stored) => store.save(stored).await,
            None => store.clear().await,
        };
        if let Err(e) = result {
            warn!("Session persistence failed: {}", e);
        }
    }

    async fn ensure_loaded(&self, current: &mut Option<StoredSession>) {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(store) = &self.store {
            if let Some(stored) = store.load().await {
                debug!("Restored session from {}", store.path().display());
                *current = Some(stored);
            }
        }
    }

    async fn replace(&self, next: Option<StoredSession>, kind: AuthEventKind) -> Option<Session> {
        {
            let mut current = self.current.lock().await;
            self.loaded.store(true, Ordering::SeqCst);
            *current = next.clone();
        }
        self.persist(next.as_ref()).await;

        let session = next.map(|stored| stored.to_session());
        self.listeners.emit(&AuthEvent::new(kind, session.clone()));
        session
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn get_session(&self) -> Result<Option<Session>, ClientError> {
        let stored = {
            let mut current = self.current.lock().await;
            self.ensure_loaded(&mut current).await;
            current.clone()
        };

        let Some(stored) = stored else {
            return Ok(None);
        };
        if !stored.is_expired_at(Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(Some(stored.to_session()));
        }

        let Some(refresh_token) = stored.refresh_token.clone() else {
            info!("Session expired and cannot be refreshed");
            return Ok(self.replace(None, AuthEventKind::SignedOut).await);
        };

        match self
            .post_grant(
                REFRESH_GRANT_ENDPOINT,
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await
        {
            Ok(renewed) => {
                debug!("Access token refreshed");
                Ok(self
                    .replace(Some(renewed.into_stored()), AuthEventKind::TokenRefreshed)
                    .await)
            }
            Err(e @ (ClientError::Network(_) | ClientError::TimedOut)) => Err(e),
            Err(e) => {
                warn!("Token refresh rejected, signing out: {}", e);
                Ok(self.replace(None, AuthEventKind::SignedOut).await)
            }
        }
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.listeners.subscribe(move |event| listener(event))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let token = self
            .post_grant(
                PASSWORD_GRANT_ENDPOINT,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        self.replace(Some(token.into_stored()), AuthEventKind::SignedIn)
            .await
            .ok_or_else(|| ClientError::Identity("Sign-in returned no session".to_string()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, ClientError> {
        let response = self
            .client
            .post(self.url(SIGNUP_ENDPOINT))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Identity(auth_error_message(&text, status.as_u16())));
        }

        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("Failed to parse sign-up response: {}", e)))?;
        if body.get("access_token").is_none() {
            info!("Sign-up for {} awaits e-mail confirmation", email);
            return Ok(SignUpOutcome::ConfirmationRequired);
        }

        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| ClientError::Decode(format!("Failed to parse sign-up session: {}", e)))?;
        match self.replace(Some(token.into_stored()), AuthEventKind::SignedIn).await {
            Some(session) => Ok(SignUpOutcome::SignedIn(session)),
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        let previous = {
            let mut current = self.current.lock().await;
            self.ensure_loaded(&mut current).await;
            current.clone()
        };

        if let Some(stored) = previous {
            let result = self
                .client
                .post(self.url(LOGOUT_ENDPOINT))
                .header("apikey", &self.anon_key)
                .bearer_auth(&stored.access_token)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => warn!("Remote sign-out answered {}", response.status()),
                Err(e) => warn!("Remote sign-out failed: {}", e),
            }
        }

        self.replace(None, AuthEventKind::SignedOut).await;
        Ok(())
    }
}

fn auth_error_message(text: &str, status: u16) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(text).ok();
    parsed
        .as_ref()
        .and_then(|body| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("identity provider answered {}", status))
}
