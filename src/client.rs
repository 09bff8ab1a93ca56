use std::sync::{Arc, PoisonError, RwLock};

use http::request::Parts;

use crate::backend::{Authentication, CasBackend, LogoutParams};
use crate::config::{CasConfig, LogTarget, ValidationMode};
use crate::error::Error;
use crate::session::{self, HostSession, SessionEnvironment};
use crate::types::{AttributeValue, Attributes};

/// What the caller should do with the request after [`CasClient::logout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutCompletion {
    /// Stop handling the request and send the browser to `location`.
    Terminate { location: String },
    /// Keep running the handler. Used in tests and tooling.
    Continue,
}

/// Decides how a request ends once the CAS logout has been issued.
pub trait LogoutStrategy: Send + Sync {
    fn complete_logout(&self, location: String) -> LogoutCompletion;
}

/// Default strategy: the request ends with a redirect to the CAS logout page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminateRequest;

impl LogoutStrategy for TerminateRequest {
    fn complete_logout(&self, location: String) -> LogoutCompletion {
        LogoutCompletion::Terminate { location }
    }
}

/// Strategy that lets the handler keep running after logout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueRequest;

impl LogoutStrategy for ContinueRequest {
    fn complete_logout(&self, _location: String) -> LogoutCompletion {
        LogoutCompletion::Continue
    }
}

/// Builder for [`CasClient`]. Construction configures the backend; no
/// authentication happens until a request method is called.
pub struct CasClientBuilder {
    config: CasConfig,
    backend: Arc<dyn CasBackend>,
    session: Arc<dyn SessionEnvironment>,
    logout_strategy: Arc<dyn LogoutStrategy>,
    log_target: LogTarget,
}

impl CasClientBuilder {
    #[must_use]
    pub fn with_session_environment(mut self, session: Arc<dyn SessionEnvironment>) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_logout_strategy(mut self, strategy: Arc<dyn LogoutStrategy>) -> Self {
        self.logout_strategy = strategy;
        self
    }

    /// Attach a log destination. Defaults to the config's `cas_log`.
    #[must_use]
    pub fn with_logger(mut self, target: LogTarget) -> Self {
        self.log_target = target;
        self
    }

    /// Configure the backend and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend rejects initialization or
    /// the certificate settings.
    pub fn build(self) -> Result<CasClient, Error> {
        let Self { config, backend, session, logout_strategy, log_target } = self;
        let diagnostics = log_target != LogTarget::Disabled;

        if diagnostics && config.version_fallback() {
            tracing::warn!(target: "cas", version = %config.version(), "Invalid CAS version set; reverting to 2.0");
        }

        backend.set_verbose(config.verbose_errors());

        if session::bootstrap(session.as_ref(), &config) && diagnostics {
            tracing::debug!(target: "cas", name = %config.session_name(), "Session cookie hardened");
        }

        backend
            .initialize(config.client_mode(), &config.server_params())
            .map_err(Error::backend("initialize"))?;

        if config.saml_enabled() {
            // Single-logout requests are only accepted from the CAS hosts.
            backend.handle_logout_requests(true, &config.trusted_hosts());
        }

        match config.validation() {
            ValidationMode::Ca | ValidationMode::SelfSigned => backend
                .set_ca_cert(config.cert(), config.validate_cn())
                .map_err(Error::backend("set_ca_cert"))?,
            ValidationMode::None => backend.set_no_validation(),
        }

        backend.set_login_url(config.login_url());
        if let Some(url) = config.redirect_path() {
            backend.set_fixed_service_url(url);
        }
        backend.set_logout_url(config.logout_url());

        let masquerading = config.masquerade().is_some();

        if diagnostics {
            if config.debug() {
                tracing::info!(target: "cas", config = ?config, "CAS client configured");
            } else {
                tracing::debug!(target: "cas", config = ?config, "CAS client configured");
            }
            if let Some(user) = config.masquerade() {
                tracing::info!(target: "cas", user = %user, "Masquerading as user");
            }
        }

        Ok(CasClient {
            config,
            backend,
            logout_strategy,
            masquerading,
            attributes: RwLock::new(Attributes::new()),
            diagnostics,
        })
    }
}

/// CAS client facade.
///
/// Delegates to the [`CasBackend`] unless a masquerade identity is
/// configured, in which case every identity query is answered locally and
/// the CAS server is never contacted for it. The choice is fixed at
/// construction.
pub struct CasClient {
    config: CasConfig,
    backend: Arc<dyn CasBackend>,
    logout_strategy: Arc<dyn LogoutStrategy>,
    masquerading: bool,
    attributes: RwLock<Attributes>,
    diagnostics: bool,
}

impl std::fmt::Debug for CasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasClient")
            .field("config", &self.config)
            .field("masquerading", &self.masquerading)
            .finish_non_exhaustive()
    }
}

impl CasClient {
    #[must_use]
    pub fn builder(config: CasConfig, backend: Arc<dyn CasBackend>) -> CasClientBuilder {
        let log_target = config.log_target();
        CasClientBuilder {
            config,
            backend,
            session: Arc::new(HostSession::new()),
            logout_strategy: Arc::new(TerminateRequest),
            log_target,
        }
    }

    /// Build with the default session environment and logout strategy.
    ///
    /// # Errors
    ///
    /// See [`CasClientBuilder::build`].
    pub fn new(config: CasConfig, backend: Arc<dyn CasBackend>) -> Result<Self, Error> {
        Self::builder(config, backend).build()
    }

    #[must_use]
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    #[must_use]
    pub fn is_masquerading(&self) -> bool {
        self.masquerading
    }

    /// Authenticate the request, or tell the caller where to send it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn authenticate(&self, request: &Parts) -> Result<Authentication, Error> {
        if self.masquerading {
            return Ok(Authentication::Authenticated);
        }
        self.backend
            .force_authentication(request)
            .await
            .map_err(Error::backend("force_authentication"))
    }

    /// The masquerade identity, or the principal validated by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails, including when it is
    /// called before authentication completed.
    pub async fn user(&self, request: &Parts) -> Result<String, Error> {
        if let Some(user) = self.masquerade_user() {
            return Ok(user.to_owned());
        }
        self.backend.user(request).await.map_err(Error::backend("user"))
    }

    /// Alias of [`user`](Self::user).
    ///
    /// # Errors
    ///
    /// See [`user`](Self::user).
    pub async fn current_user(&self, request: &Parts) -> Result<String, Error> {
        self.user(request).await
    }

    /// A single attribute; `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn attribute(
        &self,
        request: &Parts,
        key: &str,
    ) -> Result<Option<AttributeValue>, Error> {
        if self.masquerading {
            return Ok(self.local_attributes().get(key).cloned());
        }
        self.backend
            .attribute(request, key)
            .await
            .map_err(Error::backend("attribute"))
    }

    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn has_attribute(&self, request: &Parts, key: &str) -> Result<bool, Error> {
        if self.masquerading {
            return Ok(self.local_attributes().contains_key(key));
        }
        self.backend
            .has_attribute(request, key)
            .await
            .map_err(Error::backend("has_attribute"))
    }

    /// All attributes of the authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn attributes(&self, request: &Parts) -> Result<Attributes, Error> {
        if self.masquerading {
            return Ok(self.local_attributes());
        }
        self.backend
            .attributes(request)
            .await
            .map_err(Error::backend("attributes"))
    }

    /// Local authentication check. Always `true` when masquerading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn is_authenticated(&self, request: &Parts) -> Result<bool, Error> {
        if self.masquerading {
            return Ok(true);
        }
        self.backend
            .is_authenticated(request)
            .await
            .map_err(Error::backend("is_authenticated"))
    }

    /// Gateway check against the CAS server. Always `true` when masquerading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails.
    pub async fn check_authentication(&self, request: &Parts) -> Result<bool, Error> {
        if self.masquerading {
            return Ok(true);
        }
        self.backend
            .check_authentication(request)
            .await
            .map_err(Error::backend("check_authentication"))
    }

    /// End the CAS session.
    ///
    /// An explicit `service` wins over the configured `cas_logout_redirect`;
    /// `url` is passed on independently. Empty strings count as absent. The
    /// returned completion comes from the configured [`LogoutStrategy`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend logout fails.
    pub async fn logout(
        &self,
        request: &Parts,
        url: Option<&str>,
        service: Option<&str>,
    ) -> Result<LogoutCompletion, Error> {
        if self.diagnostics
            && matches!(self.backend.is_session_authenticated(request).await, Ok(true))
        {
            tracing::info!(target: "cas", "Logout requested for an authenticated CAS session");
        }

        let params = LogoutParams {
            service: service
                .filter(|s| !s.is_empty())
                .or_else(|| self.config.logout_redirect())
                .map(str::to_owned),
            url: url.filter(|u| !u.is_empty()).map(str::to_owned),
        };

        let location = self
            .backend
            .logout(request, &params)
            .await
            .map_err(Error::backend("logout"))?;

        Ok(self.logout_strategy.complete_logout(location))
    }

    /// Logout, returning the user to `url`.
    ///
    /// # Errors
    ///
    /// See [`logout`](Self::logout).
    pub async fn logout_with_url(
        &self,
        request: &Parts,
        url: &str,
    ) -> Result<LogoutCompletion, Error> {
        self.logout(request, Some(url), None).await
    }

    /// Replace the masquerade attributes. Has no visible effect unless
    /// masquerading.
    pub fn set_attributes(&self, attributes: Attributes) {
        if self.diagnostics {
            tracing::info!(
                target: "cas",
                attributes = ?attributes,
                "Forced setting of masquerade attributes"
            );
        }
        *self.attributes.write().unwrap_or_else(PoisonError::into_inner) = attributes;
    }

    fn masquerade_user(&self) -> Option<&str> {
        if self.masquerading { self.config.masquerade() } else { None }
    }

    fn local_attributes(&self) -> Attributes {
        self.attributes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
