//! Credential manager
//!
//! Keeps one valid-or-refreshable credential and serializes refresh
//! exchanges against the token endpoint.
//!
//! # Refresh coalescing
//!
//! Refresh bookkeeping is an explicit state machine:
//!
//! - `Idle { stranded }`: no exchange in flight. `stranded` holds waiters
//!   left behind by a failed exchange (retain policy); the next exchange
//!   adopts them.
//! - `Refreshing { waiters, initiator }`: one exchange in flight. Every caller that
//!   asks for a token meanwhile is appended to `waiters`.
//!
//! The caller whose request started the exchange is queued right behind any
//! stranded waiters, so enqueue order covers it too. On success the new token is persisted
//! first, the state returns to idle, and the waiters are invoked in enqueue
//! order, each exactly once. On failure no waiter sees a token: the
//! initiator's callback is dropped, and the others are stranded for the
//! next success or dropped according to [`RefreshFailurePolicy`].
//! Stranded [`CredentialManager::valid_token`] waiters whose caller already
//! gave up are discarded rather than kept.
//!
//! The state lock is never held across an `.await` nor while waiters run.

use crate::authorize::{basic_authorization, sign_in_url};
use crate::error::{AuthError, Result};
use crate::token::{Credential, TokenResponse};
use crate::transport::{TokenRequest, TokenTransport};
use chrono::Utc;
use reqwest::Url;
use spotlet_common::config::{AuthConfig, RefreshFailurePolicy};
use spotlet_common::store::{CredentialStore, ACCESS_TOKEN_KEY, CREDENTIAL_KEYS};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Callback receiving a valid access token
pub type TokenCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// Caller waiting for a token
enum Waiter {
    Callback(TokenCallback),
    Channel(oneshot::Sender<String>),
}

impl Waiter {
    fn deliver(self, token: String) {
        match self {
            Waiter::Callback(callback) => callback(token),
            Waiter::Channel(tx) => {
                let _ = tx.send(token);
            }
        }
    }

    /// Receiver dropped (deadline passed); nobody is left to serve
    fn is_abandoned(&self) -> bool {
        matches!(self, Waiter::Channel(tx) if tx.is_closed())
    }
}

enum RefreshState {
    Idle { stranded: Vec<Waiter> },
    Refreshing {
        waiters: Vec<Waiter>,
        /// Position of the callback whose request started the exchange
        initiator: Option<usize>,
    },
}

/// Result of [`CredentialManager::refresh_if_needed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Token is outside the expiry threshold (or signed out)
    NotNeeded,
    /// Token is stale but no refresh token is stored
    NoRefreshToken,
    /// Another exchange is already running; nothing was started
    InFlight,
    /// A new access token was obtained and persisted
    Refreshed,
}

/// Decision taken under the state lock
enum RefreshStart {
    Joined,
    SignedOut,
    Fresh {
        token: String,
        waiter: Option<Waiter>,
    },
    NoRefreshToken,
    Started {
        refresh_token: String,
    },
}

/// Settles the in-flight state if the exchange future is dropped early
struct InFlight<'a> {
    manager: &'a CredentialManager,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Token refresh abandoned before completion");
            self.manager.settle_failure();
        }
    }
}

/// Owner of the OAuth2 credential
///
/// Create one per process and share it (`Arc<CredentialManager>`) with every
/// consumer that needs a token.
pub struct CredentialManager {
    config: AuthConfig,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn TokenTransport>,
    state: Mutex<RefreshState>,
}

impl CredentialManager {
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn TokenTransport>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            state: Mutex::new(RefreshState::Idle {
                stranded: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// True iff an access token is persisted (no network)
    pub fn is_signed_in(&self) -> bool {
        match self.store.get(ACCESS_TOKEN_KEY) {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read access token");
                false
            }
        }
    }

    pub fn sign_in_url(&self) -> Result<Url> {
        sign_in_url(&self.config)
    }

    /// Persisted credential, `None` when signed out
    pub fn credential(&self) -> Result<Option<Credential>> {
        Credential::load(self.store.as_ref())
    }

    /// True when the stored token is within the refresh threshold
    pub fn needs_refresh(&self) -> Result<bool> {
        Ok(self
            .credential()?
            .is_some_and(|c| c.needs_refresh(Utc::now(), self.config.refresh_threshold())))
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state(), RefreshState::Refreshing { .. })
    }

    /// Waiters queued on the in-flight exchange or stranded by a failed one
    pub fn pending_waiters(&self) -> usize {
        match &*self.state() {
            RefreshState::Idle { stranded } => stranded.len(),
            RefreshState::Refreshing { waiters, .. } => waiters.len(),
        }
    }

    /// Exchange an authorization code for a credential
    ///
    /// Nothing is persisted unless the response decodes completely.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let response = self
            .request_token(vec![
                ("grant_type", "authorization_code".to_string()),
                ("code", code.to_string()),
                ("redirect_uri", self.config.redirect_uri.clone()),
            ])
            .await?;

        Credential::store_response(self.store.as_ref(), &response, Utc::now())?;
        info!(
            expires_in = response.expires_in,
            has_refresh_token = response.refresh_token.is_some(),
            "Signed in"
        );
        Ok(())
    }

    /// Invoke `callback` with a valid access token, at most once
    ///
    /// - Exchange in flight: the callback is queued and this returns at once.
    /// - Token stale: a refresh runs and the callback gets the new token on
    ///   success. On failure it is never invoked.
    /// - Otherwise the callback runs immediately with the current token.
    ///
    /// Signed-out callers and stale tokens without a refresh token never
    /// get a callback. Callers needing a deadline should use
    /// [`CredentialManager::valid_token`].
    pub async fn with_valid_token<F>(&self, callback: F)
    where
        F: FnOnce(String) + Send + 'static,
    {
        let callback: TokenCallback = Box::new(callback);
        self.serve(Waiter::Callback(callback)).await;
    }

    /// Await a valid access token, giving up after `timeout`
    ///
    /// Returns `NoRefreshToken` for a stale token that cannot be renewed,
    /// `RefreshFailed` when the waiter was dropped (its own refresh failed,
    /// or reject policy) and `Timeout` when it was left pending.
    pub async fn valid_token(&self, timeout: Duration) -> Result<String> {
        let Some(credential) = self.credential()? else {
            return Err(AuthError::NotSignedIn);
        };
        if credential.refresh_token.is_none()
            && credential.needs_refresh(Utc::now(), self.config.refresh_threshold())
        {
            return Err(AuthError::NoRefreshToken);
        }

        let (tx, rx) = oneshot::channel();
        let wait = async {
            self.serve(Waiter::Channel(tx)).await;
            rx.await.map_err(|_| AuthError::RefreshFailed)
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| AuthError::Timeout)?
    }

    /// Refresh the credential if it is within the expiry threshold
    ///
    /// An `Err` is the failed-refresh signal; waiters queued meanwhile are
    /// not served in that case.
    pub async fn refresh_if_needed(&self) -> Result<RefreshOutcome> {
        match self.begin_refresh(None)? {
            RefreshStart::Joined => Ok(RefreshOutcome::InFlight),
            RefreshStart::SignedOut | RefreshStart::Fresh { .. } => Ok(RefreshOutcome::NotNeeded),
            RefreshStart::NoRefreshToken => {
                debug!("Refresh skipped: no refresh token stored");
                Ok(RefreshOutcome::NoRefreshToken)
            }
            RefreshStart::Started { refresh_token } => {
                self.run_refresh(refresh_token).await?;
                Ok(RefreshOutcome::Refreshed)
            }
        }
    }

    /// Clear access token, refresh token and expiry in one store call
    pub fn sign_out(&self) -> Result<()> {
        self.store.clear_many(&CREDENTIAL_KEYS)?;
        info!("Signed out, credential cleared");
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn serve(&self, waiter: Waiter) {
        match self.begin_refresh(Some(waiter)) {
            Ok(RefreshStart::Joined) => debug!("Refresh in flight, token waiter queued"),
            Ok(RefreshStart::Fresh { token, waiter }) => {
                if let Some(waiter) = waiter {
                    waiter.deliver(token);
                }
            }
            Ok(RefreshStart::SignedOut) => debug!("Token requested while signed out"),
            Ok(RefreshStart::NoRefreshToken) => {
                warn!("Access token is stale and no refresh token is stored")
            }
            Ok(RefreshStart::Started { refresh_token }) => {
                // Failure is logged inside; the waiter stays unserved.
                let _ = self.run_refresh(refresh_token).await;
            }
            Err(e) => warn!(error = %e, "Could not read credential"),
        }
    }

    fn begin_refresh(&self, waiter: Option<Waiter>) -> Result<RefreshStart> {
        let mut state = self.state();

        let stranded = match &mut *state {
            RefreshState::Refreshing { waiters, .. } => {
                waiters.extend(waiter);
                return Ok(RefreshStart::Joined);
            }
            RefreshState::Idle { stranded } => stranded,
        };

        let Some(credential) = self.credential()? else {
            return Ok(RefreshStart::SignedOut);
        };

        if !credential.needs_refresh(Utc::now(), self.config.refresh_threshold()) {
            return Ok(RefreshStart::Fresh {
                token: credential.access_token,
                waiter,
            });
        }

        let Some(refresh_token) = credential.refresh_token else {
            return Ok(RefreshStart::NoRefreshToken);
        };

        let mut waiters = std::mem::take(stranded);
        waiters.retain(|w| !w.is_abandoned());
        let initiator = waiter.is_some().then_some(waiters.len());
        waiters.extend(waiter);
        debug!(waiters = waiters.len(), "Starting token refresh");
        *state = RefreshState::Refreshing { waiters, initiator };

        Ok(RefreshStart::Started { refresh_token })
    }

    async fn run_refresh(&self, refresh_token: String) -> Result<String> {
        let mut in_flight = InFlight {
            manager: self,
            settled: false,
        };

        let result = self
            .request_token(vec![
                ("grant_type", "refresh_token".to_string()),
                ("refresh_token", refresh_token),
            ])
            .await;

        let outcome = match result {
            Ok(response) => self.settle_success(response),
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                self.settle_failure();
                Err(e)
            }
        };
        in_flight.settled = true;
        outcome
    }

    fn settle_success(&self, response: TokenResponse) -> Result<String> {
        if let Err(e) = Credential::store_response(self.store.as_ref(), &response, Utc::now()) {
            error!(error = %e, "Could not persist refreshed credential");
            self.settle_failure();
            return Err(e);
        }

        let waiters = match std::mem::replace(
            &mut *self.state(),
            RefreshState::Idle {
                stranded: Vec::new(),
            },
        ) {
            RefreshState::Refreshing { waiters, .. } => waiters,
            RefreshState::Idle { stranded } => stranded,
        };

        info!(
            waiters = waiters.len(),
            expires_in = response.expires_in,
            rotated_refresh_token = response.refresh_token.is_some(),
            "Token refreshed"
        );

        for waiter in waiters {
            waiter.deliver(response.access_token.clone());
        }
        Ok(response.access_token)
    }

    fn settle_failure(&self) {
        let dropped = {
            let mut state = self.state();
            let mut waiters = match std::mem::replace(
                &mut *state,
                RefreshState::Idle {
                    stranded: Vec::new(),
                },
            ) {
                RefreshState::Refreshing { mut waiters, initiator } => {
                    if let Some(index) = initiator.filter(|&i| i < waiters.len()) {
                        drop(waiters.remove(index));
                    }
                    waiters
                }
                RefreshState::Idle { stranded } => stranded,
            };

            match self.config.on_refresh_failure {
                RefreshFailurePolicy::Retain => {
                    let before = waiters.len();
                    waiters.retain(|w| !w.is_abandoned());
                    if waiters.len() < before {
                        debug!(
                            discarded = before - waiters.len(),
                            "Discarded token waiters whose callers gave up"
                        );
                    }
                    if !waiters.is_empty() {
                        warn!(waiters = waiters.len(), "Token waiters left pending");
                    }
                    *state = RefreshState::Idle { stranded: waiters };
                    Vec::new()
                }
                RefreshFailurePolicy::Reject => waiters,
            }
        };

        if !dropped.is_empty() {
            warn!(waiters = dropped.len(), "Token waiters rejected");
        }
    }

    async fn request_token(&self, form: Vec<(&str, String)>) -> Result<TokenResponse> {
        let request = TokenRequest {
            url: self.config.token_url.clone(),
            headers: vec![
                (
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
                (
                    "Authorization".to_string(),
                    basic_authorization(&self.config.client_id, &self.config.client_secret),
                ),
            ],
            form: form
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        };

        let body = self.transport.post_form(&request).await?;

        serde_json::from_slice::<TokenResponse>(&body).map_err(|e| {
            error!(error = %e, body_len = body.len(), "Failed to decode token response");
            AuthError::from(e)
        })
    }
}
