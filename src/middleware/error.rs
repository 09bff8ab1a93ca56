use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No CAS session and the request cannot be redirected (AJAX), or the
    /// gate did not run for this route.
    #[error("Unauthorized.")]
    Unauthenticated,

    /// The CAS client failed or is not registered.
    #[error("CAS error: {0}")]
    Cas(#[from] crate::error::Error),

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            Self::Cas(_) | Self::Store(_) | Self::Config(_) => {
                tracing::error!(target: "cas", error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
