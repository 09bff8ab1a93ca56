use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key};

use super::config::{AuthSettings, CasAuthConfig};
use super::cookies;
use super::error::AuthError;
use super::extractor::CasUser;
use super::traits::SessionStore;
use super::types::NewSession;
use crate::client::CasClient;

/// Shared state for the CAS gate and routes.
pub struct CasAuth<S> {
    pub(super) client: Arc<CasClient>,
    pub(super) session_store: Arc<S>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for CasAuth<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            session_store: self.session_store.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S: SessionStore> FromRef<CasAuth<S>> for Key {
    fn from_ref(state: &CasAuth<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}

impl<S: SessionStore> CasAuth<S> {
    #[must_use]
    pub fn new(config: CasAuthConfig, session_store: S) -> Self {
        Self {
            client: config.client,
            session_store: Arc::new(session_store),
            settings: config.settings,
        }
    }

    #[must_use]
    pub fn client(&self) -> &Arc<CasClient> {
        &self.client
    }

    #[must_use]
    pub fn session_store(&self) -> &Arc<S> {
        &self.session_store
    }

    /// The principal cached under the request's session cookie, if any.
    pub(super) async fn cached_user(
        &self,
        jar: &PrivateCookieJar,
    ) -> Result<Option<CasUser>, AuthError> {
        let Some(cookie) = jar.get(&self.settings.session_cookie_name) else {
            return Ok(None);
        };
        self.session_store
            .find(cookie.value())
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    /// Persist the principal of an authenticated request.
    ///
    /// Returns the user and the session cookie to set.
    pub(super) async fn establish_session(
        &self,
        parts: &Parts,
    ) -> Result<(CasUser, Cookie<'static>), AuthError> {
        let user = self.client.user(parts).await?;
        let attributes = self.client.attributes(parts).await?;

        let session_id = self
            .session_store
            .create(NewSession { user: user.clone(), attributes: attributes.clone() })
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let cookie = cookies::session_cookie(
            &self.settings.session_cookie_name,
            session_id.as_str(),
            &self.settings.cookie,
        );

        tracing::info!(target: "cas", session_id = %session_id, user = %user, "CAS session established");

        Ok((CasUser { session_id, user, attributes }, cookie))
    }

    /// Drop the cached session and return the jar with the cookie removed.
    pub(super) async fn end_session(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        if let Some(cookie) = jar.get(&self.settings.session_cookie_name) {
            if let Err(e) = self.session_store.delete(cookie.value()).await {
                tracing::warn!(target: "cas", error = %e, "Session deletion failed during logout");
            }
        }

        let clear_cookie =
            cookies::clear_session_cookie(&self.settings.session_cookie_name, &self.settings.cookie);
        jar.remove(clear_cookie)
    }
}
