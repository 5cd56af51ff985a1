//! Test helpers for credential manager tests
//!
//! - ScriptedTransport: replays canned token endpoint replies and records
//!   every request; can hold a request in flight until released
//! - seed_credential: write a credential with a chosen time to expiry

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use spotlet_auth::{AuthError, CredentialManager, TokenRequest, TokenTransport};
use spotlet_common::config::AuthConfig;
use spotlet_common::store::{
    CredentialStore, ACCESS_TOKEN_KEY, EXPIRATION_DATE_KEY, REFRESH_TOKEN_KEY,
};
use spotlet_common::MemoryStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Canned reply for one request
pub enum Reply {
    Body(String),
    NetworkError,
}

/// JSON body of a token response
pub fn token_body(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> String {
    let mut value = serde_json::json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "scope": "user-read-private",
        "token_type": "Bearer",
    });
    if let Some(refresh_token) = refresh_token {
        value["refresh_token"] = serde_json::Value::String(refresh_token.to_string());
    }
    value.to_string()
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<TokenRequest>>,
    gate: Option<Gate>,
}

/// Holds requests until `release` is notified
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Transport that parks each request until the returned gate is released
    pub fn gated(replies: Vec<Reply>) -> (Self, Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let transport = Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: Some(Gate {
                entered: entered.clone(),
                release: release.clone(),
            }),
        };
        (transport, entered, release)
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenTransport for ScriptedTransport {
    async fn post_form(&self, request: &TokenRequest) -> Result<Vec<u8>, AuthError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::NetworkError) | None => {
                Err(AuthError::Transport("connection refused".to_string()))
            }
        }
    }
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "https://example.com/callback".to_string(),
        token_url: "https://accounts.example.com/api/token".to_string(),
        ..Default::default()
    }
}

/// Store a credential expiring `expires_in_secs` from now
pub fn seed_credential(
    store: &dyn CredentialStore,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in_secs: i64,
) {
    store.set(ACCESS_TOKEN_KEY, access_token).unwrap();
    if let Some(refresh_token) = refresh_token {
        store.set(REFRESH_TOKEN_KEY, refresh_token).unwrap();
    }
    let expires_at = Utc::now() + Duration::seconds(expires_in_secs);
    store
        .set(EXPIRATION_DATE_KEY, &expires_at.to_rfc3339())
        .unwrap();
}

pub fn manager_with(
    config: AuthConfig,
    store: Arc<MemoryStore>,
    transport: Arc<ScriptedTransport>,
) -> CredentialManager {
    CredentialManager::new(config, store, transport)
}
