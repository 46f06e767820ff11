use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Failure classes of the remote movie API. The fetch pipeline logs the class
/// and then collapses all of them into one user-facing message.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn class(&self) -> &'static str {
        match self {
            RemoteError::Transport(_) => "transport",
            RemoteError::Status(_) => "status",
            RemoteError::Decode(_) => "decode",
        }
    }
}

impl From<wreq::Error> for RemoteError {
    fn from(err: wreq::Error) -> Self {
        if let Some(status) = err.status() {
            return RemoteError::Status(status.as_u16());
        }
        if err.is_decode() {
            return RemoteError::Decode(err.to_string());
        }
        RemoteError::Transport(err.to_string())
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: anyhow::Error,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, inner: anyhow::anyhow!(message.into()) }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_GATEWAY, inner: anyhow::anyhow!(message.into()) }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, inner: err }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::from(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.inner, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.inner.to_string() }));
        (self.status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
