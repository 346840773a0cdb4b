//! Cookie session handling with transparent re-authentication
//!
//! Every request goes through [`Session::send`]. A 401 response means the
//! session cookie is missing or expired: the session logs in again with the
//! stored password and replays the request, up to [`MAX_AUTH_RETRIES`]
//! times. Any other response is handed back untouched.
//!
//! Logins are single-flight. A request remembers which session generation
//! it was sent with; if another request already refreshed the session by
//! the time it gets the login lock, it replays with the new cookie instead
//! of logging in again.

use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::models::ApiError;
use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Re-authentications allowed for one logical request
pub const MAX_AUTH_RETRIES: usize = 3;

pub const SESSION_PATH: &str = "/api/session";

/// Unrecoverable authentication failures.
///
/// These mean the client is misconfigured (wrong password, server gone)
/// rather than that a single call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Intercept Error: Authorization retries limit exceeded.")]
    RetriesExceeded,

    #[error("Intercept Error: Authorization Error: {0}")]
    LoginFailed(String),
}

/// Failure of [`Session::send`]
#[derive(Error, Debug)]
pub enum SendError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No login attempted yet
    Unauthenticated,
    /// A login is in flight
    Authenticating,
    /// Holding a cookie the server accepted at login
    Authenticated,
    /// The last login failed or a request ran out of retries
    Failed,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    cookie: Option<String>,
    /// Bumped on every successful login
    generation: u64,
}

pub struct Session {
    transport: Arc<dyn Transport>,
    password: String,
    state: RwLock<SessionState>,
    login_lock: Mutex<()>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, password: impl Into<String>) -> Self {
        Self {
            transport,
            password: password.into(),
            state: RwLock::new(SessionState {
                phase: SessionPhase::Unauthenticated,
                cookie: None,
                generation: 0,
            }),
            login_lock: Mutex::new(()),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// Send `request`, re-authenticating and replaying on 401
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SendError> {
        let mut retries = 0;

        loop {
            let (cookie, generation) = {
                let state = self.state.read().await;
                (state.cookie.clone(), state.generation)
            };

            let response = self.transport.execute(request, cookie.as_deref()).await?;
            if response.status != StatusCode::UNAUTHORIZED {
                if cookie.is_some() {
                    self.confirm_session(generation).await;
                }
                return Ok(response);
            }

            debug!(
                "{} {} returned 401 (retry {}/{})",
                request.method, request.path, retries, MAX_AUTH_RETRIES
            );
            if retries >= MAX_AUTH_RETRIES {
                warn!(
                    "Giving up on {} {} after {} re-authentications",
                    request.method, request.path, MAX_AUTH_RETRIES
                );
                self.state.write().await.phase = SessionPhase::Failed;
                return Err(AuthorizationError::RetriesExceeded.into());
            }
            retries += 1;

            self.reauthenticate(generation).await?;
        }
    }

    /// The server accepted the cookie of `generation`, so a `Failed` left by
    /// another request's exhausted retries no longer holds.
    async fn confirm_session(&self, generation: u64) {
        if self.state.read().await.phase != SessionPhase::Failed {
            return;
        }

        let mut state = self.state.write().await;
        if state.phase == SessionPhase::Failed && state.generation == generation {
            debug!("Session cookie accepted again");
            state.phase = SessionPhase::Authenticated;
        }
    }

    /// Log in now instead of waiting for the first 401
    pub async fn login(&self) -> Result<(), AuthorizationError> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    async fn reauthenticate(&self, stale_generation: u64) -> Result<(), AuthorizationError> {
        let _guard = self.login_lock.lock().await;

        if self.state.read().await.generation != stale_generation {
            debug!("Session already refreshed by a concurrent request");
            return Ok(());
        }

        self.login_locked().await
    }

    /// Caller must hold `login_lock`
    async fn login_locked(&self) -> Result<(), AuthorizationError> {
        info!("Authenticating with wg-easy");
        self.state.write().await.phase = SessionPhase::Authenticating;

        match self.request_cookie().await {
            Ok(cookie) => {
                let mut state = self.state.write().await;
                state.cookie = Some(cookie);
                state.generation += 1;
                state.phase = SessionPhase::Authenticated;
                debug!("Session established (generation {})", state.generation);
                Ok(())
            }
            Err(cause) => {
                warn!("Login failed: {}", cause);
                self.state.write().await.phase = SessionPhase::Failed;
                Err(AuthorizationError::LoginFailed(cause))
            }
        }
    }

    async fn request_cookie(&self) -> Result<String, String> {
        let request = ApiRequest::post(SESSION_PATH, Some(json!({ "password": self.password })));

        let response = self
            .transport
            .execute(&request, None)
            .await
            .map_err(|e| e.to_string())?;

        if !response.status.is_success() {
            return Err(format!(
                "Login returned {}: {}",
                response.status,
                ApiError::from_body(&response.body)
            ));
        }

        response
            .set_cookie
            .first()
            .and_then(|raw| session_cookie(raw))
            .ok_or_else(|| "No cookies received from authentication.".to_string())
    }
}

/// `name=value` part of a `Set-Cookie` header, without attributes
fn session_cookie(set_cookie: &str) -> Option<String> {
    let pair = set_cookie.split(';').next()?.trim();
    if pair.contains('=') {
        Some(pair.to_string())
    } else {
        None
    }
}
