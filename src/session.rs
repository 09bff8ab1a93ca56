//! One-time session cookie hardening, applied before the backend starts
//! handling sessions.

use std::sync::{PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::CasConfig;

/// Session cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieParams {
    pub lifetime_secs: i64,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

/// The host's session handling, as seen by the CAS client.
pub trait SessionEnvironment: Send + Sync {
    /// Whether any part of the response has already been written.
    fn headers_sent(&self) -> bool;

    /// Current session id, `None` if no session has been started.
    fn session_id(&self) -> Option<String>;

    fn set_session_name(&self, name: &str);

    fn set_cookie_params(&self, params: &CookieParams);
}

/// Apply the configured session name and cookie parameters.
///
/// Does nothing once headers are out or a session already exists. Returns
/// whether the settings were applied.
pub fn bootstrap(env: &dyn SessionEnvironment, config: &CasConfig) -> bool {
    if env.headers_sent() || env.session_id().is_some() {
        return false;
    }

    env.set_session_name(config.session_name());
    env.set_cookie_params(&config.cookie_params());
    true
}

/// Default [`SessionEnvironment`]: records the applied settings so the host
/// (or the bundled middleware) can read them back.
#[derive(Debug, Default)]
pub struct HostSession {
    headers_sent: AtomicBool,
    session_id: RwLock<Option<String>>,
    name: RwLock<Option<String>>,
    cookie: RwLock<Option<CookieParams>>,
}

impl HostSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_headers_sent(&self) {
        self.headers_sent.store(true, Ordering::SeqCst);
    }

    pub fn start(&self, id: impl Into<String>) {
        *self.session_id.write().unwrap_or_else(PoisonError::into_inner) = Some(id.into());
    }

    /// Session name applied by [`bootstrap`], if any.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Cookie parameters applied by [`bootstrap`], if any.
    #[must_use]
    pub fn cookie_params(&self) -> Option<CookieParams> {
        self.cookie.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SessionEnvironment for HostSession {
    fn headers_sent(&self) -> bool {
        self.headers_sent.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_session_name(&self, name: &str) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = Some(name.to_owned());
    }

    fn set_cookie_params(&self, params: &CookieParams) {
        *self.cookie.write().unwrap_or_else(PoisonError::into_inner) = Some(params.clone());
    }
}
