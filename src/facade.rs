//! Static access to the registered [`CasClient`].
//!
//! ```rust,ignore
//! use cas_connect::Cas;
//!
//! async fn whoami(parts: Parts) -> Result<String, cas_connect::Error> {
//!     Cas::user(&parts).await
//! }
//! ```

use std::sync::Arc;

use http::request::Parts;

use crate::backend::Authentication;
use crate::client::{CasClient, LogoutCompletion};
use crate::config::CasConfig;
use crate::error::Error;
use crate::provider::{CONTAINER_KEY, registered};
use crate::types::{AttributeValue, Attributes};

/// The registered client.
///
/// # Errors
///
/// Returns [`Error::NotRegistered`] if no client has been registered.
pub fn cas() -> Result<Arc<CasClient>, Error> {
    registered().ok_or(Error::NotRegistered(CONTAINER_KEY))
}

/// Forwards to the client registered by
/// [`CasServiceProvider::register`](crate::CasServiceProvider::register).
///
/// Every method fails with [`Error::NotRegistered`] before registration.
pub struct Cas;

impl Cas {
    /// Same as [`cas`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if no client has been registered.
    pub fn client() -> Result<Arc<CasClient>, Error> {
        cas()
    }

    pub async fn authenticate(request: &Parts) -> Result<Authentication, Error> {
        Self::client()?.authenticate(request).await
    }

    pub async fn user(request: &Parts) -> Result<String, Error> {
        Self::client()?.user(request).await
    }

    pub async fn current_user(request: &Parts) -> Result<String, Error> {
        Self::client()?.current_user(request).await
    }

    pub async fn attribute(request: &Parts, key: &str) -> Result<Option<AttributeValue>, Error> {
        Self::client()?.attribute(request, key).await
    }

    pub async fn has_attribute(request: &Parts, key: &str) -> Result<bool, Error> {
        Self::client()?.has_attribute(request, key).await
    }

    pub async fn attributes(request: &Parts) -> Result<Attributes, Error> {
        Self::client()?.attributes(request).await
    }

    pub async fn is_authenticated(request: &Parts) -> Result<bool, Error> {
        Self::client()?.is_authenticated(request).await
    }

    pub async fn check_authentication(request: &Parts) -> Result<bool, Error> {
        Self::client()?.check_authentication(request).await
    }

    pub async fn logout(
        request: &Parts,
        url: Option<&str>,
        service: Option<&str>,
    ) -> Result<LogoutCompletion, Error> {
        Self::client()?.logout(request, url, service).await
    }

    pub async fn logout_with_url(request: &Parts, url: &str) -> Result<LogoutCompletion, Error> {
        Self::client()?.logout_with_url(request, url).await
    }

    pub fn set_attributes(attributes: Attributes) -> Result<(), Error> {
        Self::client()?.set_attributes(attributes);
        Ok(())
    }

    pub fn is_masquerading() -> Result<bool, Error> {
        Ok(Self::client()?.is_masquerading())
    }

    pub fn config() -> Result<CasConfig, Error> {
        Ok(Self::client()?.config().clone())
    }
}
