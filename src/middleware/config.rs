use std::sync::Arc;

use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use crate::client::CasClient;
use crate::facade::Cas;
use crate::session::CookieParams;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) cookie: CookieParams,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) authenticated_redirect: String,
}

impl AuthSettings {
    fn from_client(client: &CasClient) -> Self {
        let config = client.config();
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: config.session_name().to_owned(),
            cookie: config.cookie_params(),
            auth_path: "/cas".into(),
            login_redirect: "/".into(),
            authenticated_redirect: config.redirect_path().unwrap_or("/").to_owned(),
        }
    }
}

/// CAS middleware configuration.
///
/// Cookie name and attributes default to the client's `cas_session_*`
/// options; the redirect for already-authenticated visitors defaults to
/// `cas_redirect_path`.
pub struct CasAuthConfig {
    pub(super) client: Arc<CasClient>,
    pub(super) settings: AuthSettings,
}

impl CasAuthConfig {
    #[must_use]
    pub fn new(client: Arc<CasClient>) -> Self {
        let settings = AuthSettings::from_client(&client);
        Self { client, settings }
    }

    /// Config for `client` with the cookie key taken from the environment.
    ///
    /// # Optional env vars
    /// - `COOKIE_KEY`: Cookie encryption key bytes (at least 64). An
    ///   ephemeral key is generated when unset.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if `COOKIE_KEY` is set but too short.
    pub fn from_env(client: Arc<CasClient>) -> Result<Self, AuthError> {
        let config = Self::new(client);
        match std::env::var("COOKIE_KEY") {
            Ok(k) => {
                let key = Key::try_from(k.as_bytes()).map_err(|_| {
                    AuthError::Config(
                        "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                         Remove the env var to use an ephemeral key, or provide a valid key."
                            .into(),
                    )
                })?;
                Ok(config.with_cookie_key(key))
            }
            Err(_) => Ok(config),
        }
    }

    /// [`from_env`](Self::from_env) for the client registered by
    /// [`CasServiceProvider`](crate::CasServiceProvider).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Cas`] if no client is registered, or the
    /// errors of [`from_env`](Self::from_env).
    pub fn from_registered() -> Result<Self, AuthError> {
        Self::from_env(Cas::client()?)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.cookie.secure = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    /// Where `{auth_path}/login` sends the browser once authenticated.
    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    /// Where [`redirect_if_authenticated`](super::redirect_if_authenticated)
    /// sends visitors that already hold a CAS session.
    #[must_use]
    pub fn with_authenticated_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.authenticated_redirect = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CasConfig;
    use crate::testing::RecordingBackend;

    fn client(config: CasConfig) -> Arc<CasClient> {
        Arc::new(CasClient::new(config, Arc::new(RecordingBackend::new())).unwrap())
    }

    #[test]
    fn settings_follow_client_config() {
        let config = CasAuthConfig::new(client(
            CasConfig::default()
                .with_session_name("AppSession")
                .with_session_secure(true)
                .with_redirect_path("https://app.example.edu/home"),
        ));

        assert_eq!(config.settings.session_cookie_name, "AppSession");
        assert!(config.settings.cookie.secure);
        assert_eq!(config.settings.authenticated_redirect, "https://app.example.edu/home");
        assert_eq!(config.settings.auth_path, "/cas");
    }

    #[test]
    fn authenticated_redirect_defaults_to_root() {
        let config = CasAuthConfig::new(client(CasConfig::default()));
        assert_eq!(config.settings.authenticated_redirect, "/");
    }

    #[test]
    fn builders_override_defaults() {
        let config = CasAuthConfig::new(client(CasConfig::default()))
            .with_session_cookie_name("sid")
            .with_secure_cookies(true)
            .with_auth_path("/sso")
            .with_login_redirect("/home")
            .with_authenticated_redirect("/already");

        assert_eq!(config.settings.session_cookie_name, "sid");
        assert!(config.settings.cookie.secure);
        assert_eq!(config.settings.auth_path, "/sso");
        assert_eq!(config.settings.login_redirect, "/home");
        assert_eq!(config.settings.authenticated_redirect, "/already");
    }
}
