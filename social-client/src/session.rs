//! Session establishment and the route-guard probe.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::models::{LoginRequest, SignupRequest, User};

/// What the client currently believes about the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No probe has run yet.
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

pub struct Session {
    http: Arc<HttpClient>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            state: Mutex::new(SessionState::Unknown),
        }
    }

    /// Route-guard probe. One profile request decides: any failure counts as
    /// logged out, with no retry and no distinction between a 401 and an
    /// unreachable server.
    pub async fn check(&self) -> SessionState {
        let state = match self.http.fetch_profile(None).await {
            Ok(payload) => SessionState::Authenticated(payload.viewer),
            Err(error) => {
                tracing::debug!(%error, "session probe failed");
                SessionState::Unauthenticated
            }
        };
        *self.state.lock().await = state.clone();
        state
    }

    /// Last known state without touching the network.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.lock().await.user().cloned()
    }

    /// Logs in and captures the viewer so the session is immediately usable.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<User, ApiError> {
        let email = email.into();
        let password = password.into();
        if email.trim().is_empty() || password.trim().is_empty() {
            return Err(ApiError::Validation(
                "email and password are required".into(),
            ));
        }

        self.http.login(&LoginRequest { email, password }).await?;
        let payload = self.http.fetch_profile(None).await?;
        *self.state.lock().await = SessionState::Authenticated(payload.viewer.clone());
        tracing::info!(username = %payload.viewer.username, "logged in");
        Ok(payload.viewer)
    }

    /// Creates an account. Does not establish a session; callers log in
    /// afterwards.
    pub async fn signup(&self, request: SignupRequest) -> Result<(), ApiError> {
        let all_present = [
            &request.username,
            &request.email,
            &request.password,
            &request.first_name,
            &request.last_name,
        ]
        .iter()
        .all(|field| !field.trim().is_empty());
        if !all_present {
            return Err(ApiError::Validation("all signup fields are required".into()));
        }

        self.http.signup(&request).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.http.logout().await?;
        *self.state.lock().await = SessionState::Unauthenticated;
        Ok(())
    }

    /// Deletes the viewer's account and drops the session. Confirmation is
    /// the caller's responsibility.
    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.http.delete_account().await?;
        *self.state.lock().await = SessionState::Unauthenticated;
        Ok(())
    }

    /// Stores a viewer object that came embedded in some other payload.
    pub(crate) async fn capture(&self, user: User) {
        *self.state.lock().await = SessionState::Authenticated(user);
    }

    /// Marks the session gone after some request came back 401.
    pub(crate) async fn invalidate(&self) {
        *self.state.lock().await = SessionState::Unauthenticated;
    }
}
