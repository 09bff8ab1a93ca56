//! In-memory [`CasBackend`] that records every call.
//!
//! Meant for tests of code built on [`CasClient`](crate::CasClient): assert
//! what was (or was not) sent to the CAS layer without a CAS server.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use http::request::Parts;

use crate::backend::{Authentication, CasBackend, ClientMode, LogoutParams, ServerParams};
use crate::error::BoxError;
use crate::types::{AttributeValue, Attributes};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetVerbose(bool),
    Initialize(ClientMode, ServerParams),
    HandleLogoutRequests { check_client: bool, allowed_hosts: Vec<String> },
    SetCaCert { cert_path: String, validate_cn: bool },
    SetNoValidation,
    SetLoginUrl(String),
    SetFixedServiceUrl(String),
    SetLogoutUrl(String),
    ForceAuthentication,
    User,
    Attributes,
    Attribute(String),
    HasAttribute(String),
    IsSessionAuthenticated,
    IsAuthenticated,
    CheckAuthentication,
    Logout(LogoutParams),
}

pub struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    user: String,
    attributes: Attributes,
    authenticated: AtomicBool,
    gateway_authenticated: bool,
    ticket_valid: bool,
    login_location: String,
    logout_location: String,
    failing: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            user: "frank".into(),
            attributes: Attributes::new(),
            authenticated: AtomicBool::new(false),
            gateway_authenticated: false,
            ticket_valid: false,
            login_location: "https://cas.example.edu/cas/login".into(),
            logout_location: "https://cas.example.edu/cas/logout".into(),
            failing: false,
        }
    }
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Answer for `is_authenticated` and `is_session_authenticated`.
    #[must_use]
    pub fn with_authenticated(self, authenticated: bool) -> Self {
        self.authenticated.store(authenticated, Ordering::SeqCst);
        self
    }

    /// Answer for `check_authentication`.
    #[must_use]
    pub fn with_gateway_authenticated(mut self, authenticated: bool) -> Self {
        self.gateway_authenticated = authenticated;
        self
    }

    /// Whether `force_authentication` finds a valid ticket in the request.
    /// A valid ticket authenticates the session, as on the CAS callback.
    #[must_use]
    pub fn with_ticket_valid(mut self, valid: bool) -> Self {
        self.ticket_valid = valid;
        self
    }

    #[must_use]
    pub fn with_login_location(mut self, location: impl Into<String>) -> Self {
        self.login_location = location.into();
        self
    }

    /// Every request method fails with a backend error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Flip the authenticated state, as if a ticket had been validated.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    /// Parameters of every `logout` call, in order.
    #[must_use]
    pub fn logouts(&self) -> Vec<LogoutParams> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Logout(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn check(&self) -> Result<(), BoxError> {
        if self.failing {
            return Err("CAS backend unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl CasBackend for RecordingBackend {
    fn set_verbose(&self, verbose: bool) {
        self.record(Call::SetVerbose(verbose));
    }

    fn initialize(&self, mode: ClientMode, server: &ServerParams) -> Result<(), BoxError> {
        self.record(Call::Initialize(mode, server.clone()));
        Ok(())
    }

    fn handle_logout_requests(&self, check_client: bool, allowed_hosts: &[String]) {
        self.record(Call::HandleLogoutRequests {
            check_client,
            allowed_hosts: allowed_hosts.to_vec(),
        });
    }

    fn set_ca_cert(&self, cert_path: &str, validate_cn: bool) -> Result<(), BoxError> {
        self.record(Call::SetCaCert { cert_path: cert_path.to_owned(), validate_cn });
        Ok(())
    }

    fn set_no_validation(&self) {
        self.record(Call::SetNoValidation);
    }

    fn set_login_url(&self, url: &str) {
        self.record(Call::SetLoginUrl(url.to_owned()));
    }

    fn set_fixed_service_url(&self, url: &str) {
        self.record(Call::SetFixedServiceUrl(url.to_owned()));
    }

    fn set_logout_url(&self, url: &str) {
        self.record(Call::SetLogoutUrl(url.to_owned()));
    }

    async fn force_authentication(&self, _request: &Parts) -> Result<Authentication, BoxError> {
        self.record(Call::ForceAuthentication);
        self.check()?;
        if self.authenticated.load(Ordering::SeqCst) {
            Ok(Authentication::Authenticated)
        } else if self.ticket_valid {
            self.authenticated.store(true, Ordering::SeqCst);
            Ok(Authentication::Authenticated)
        } else {
            Ok(Authentication::Redirect { location: self.login_location.clone() })
        }
    }

    async fn user(&self, _request: &Parts) -> Result<String, BoxError> {
        self.record(Call::User);
        self.check()?;
        Ok(self.user.clone())
    }

    async fn attributes(&self, _request: &Parts) -> Result<Attributes, BoxError> {
        self.record(Call::Attributes);
        self.check()?;
        Ok(self.attributes.clone())
    }

    async fn attribute(
        &self,
        _request: &Parts,
        key: &str,
    ) -> Result<Option<AttributeValue>, BoxError> {
        self.record(Call::Attribute(key.to_owned()));
        self.check()?;
        Ok(self.attributes.get(key).cloned())
    }

    async fn has_attribute(&self, _request: &Parts, key: &str) -> Result<bool, BoxError> {
        self.record(Call::HasAttribute(key.to_owned()));
        self.check()?;
        Ok(self.attributes.contains_key(key))
    }

    async fn is_session_authenticated(&self, _request: &Parts) -> Result<bool, BoxError> {
        self.record(Call::IsSessionAuthenticated);
        self.check()?;
        Ok(self.authenticated.load(Ordering::SeqCst))
    }

    async fn is_authenticated(&self, _request: &Parts) -> Result<bool, BoxError> {
        self.record(Call::IsAuthenticated);
        self.check()?;
        Ok(self.authenticated.load(Ordering::SeqCst))
    }

    async fn check_authentication(&self, _request: &Parts) -> Result<bool, BoxError> {
        self.record(Call::CheckAuthentication);
        self.check()?;
        Ok(self.gateway_authenticated)
    }

    async fn logout(&self, _request: &Parts, params: &LogoutParams) -> Result<String, BoxError> {
        self.record(Call::Logout(params.clone()));
        self.check()?;
        self.authenticated.store(false, Ordering::SeqCst);
        Ok(self.logout_location.clone())
    }
}

/// Request head for calling [`CasClient`](crate::CasClient) outside a server.
#[must_use]
pub fn request_parts(uri: &str) -> Parts {
    let (parts, ()) = http::Request::builder()
        .uri(uri)
        .body(())
        .map(http::Request::into_parts)
        .unwrap_or_else(|_| http::Request::new(()).into_parts());
    parts
}

/// Formatted `tracing` output collected in memory.
///
/// ```rust,ignore
/// let logs = CapturedLogs::new();
/// tracing::subscriber::with_default(logs.subscriber(), || client_builder.build())?;
/// assert!(logs.contents().contains("Masquerading as user"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber writing every event, at every level, into this buffer.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        let logs = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap_or_else(PoisonError::into_inner))
            .into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
