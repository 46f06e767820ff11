use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity provider is not configured")]
    NotConfigured,
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Email/password identity capability, passed to whoever needs it.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self);
}

/// Firebase Auth over its REST API. The signed-in user lives in memory only.
pub struct FirebaseIdentity {
    client: wreq::Client,
    api_key: String,
    base_url: String,
    user: RwLock<Option<AuthUser>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(client: wreq::Client, api_key: String, base_url: String) -> Self {
        if api_key.trim().is_empty() {
            tracing::warn!("Authentication disabled - no FIREBASE_API_KEY provided");
        }
        Self { client, api_key, base_url, user: RwLock::new(None) }
    }

    async fn password_call(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        if self.api_key.trim().is_empty() {
            return Err(AuthError::NotConfigured);
        }

        let url = format!("{}/accounts:{}", self.base_url.trim_end_matches('/'), endpoint);
        let resp = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest { email, password, return_secure_token: true })
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("status {status}"));
            tracing::debug!(endpoint = %endpoint, message = %message, "identity provider rejected request");
            return Err(AuthError::Rejected(message));
        }

        let ok: PasswordResponse =
            serde_json::from_slice(&body).map_err(|e| AuthError::Transport(e.to_string()))?;
        let user = AuthUser { uid: ok.local_id, email: ok.email.unwrap_or_else(|| email.to_string()) };
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn current_user(&self) -> Option<AuthUser> {
        self.user.read().await.clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_out(&self) {
        *self.user.write().await = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AuthState {
    SignedOut,
    Loading,
    SignedIn(AuthUser),
    Failure(String),
}

pub struct AuthViewModel {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<AuthState>,
}

impl AuthViewModel {
    pub async fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let initial = match provider.current_user().await {
            Some(user) => AuthState::SignedIn(user),
            None => AuthState::SignedOut,
        };
        let (state, _) = watch::channel(initial);
        Self { provider, state }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.provider.current_user().await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthState {
        self.state.send_replace(AuthState::Loading);
        let result = self.provider.sign_in(email, password).await;
        self.settle(result)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthState {
        self.state.send_replace(AuthState::Loading);
        let result = self.provider.sign_up(email, password).await;
        self.settle(result)
    }

    pub async fn logout(&self) {
        self.provider.sign_out().await;
        self.state.send_replace(AuthState::SignedOut);
    }

    fn settle(&self, result: Result<AuthUser, AuthError>) -> AuthState {
        let next = match result {
            Ok(user) => AuthState::SignedIn(user),
            Err(err) => {
                tracing::warn!(error = %err, "authentication failed");
                AuthState::Failure(err.to_string())
            },
        };
        self.state.send_replace(next.clone());
        next
    }
}
