//! Interface to the CAS protocol implementation.
//!
//! This crate does not speak CAS. Ticket validation, SAML assertion parsing,
//! proxy tickets and single-logout handling belong to a [`CasBackend`]
//! supplied by the application, typically a wrapper around an audited CAS
//! client. [`CasClient`](crate::CasClient) only configures the backend and
//! forwards to it.

use async_trait::async_trait;
use http::request::Parts;
use serde::Serialize;
use url::Url;

use crate::error::BoxError;
use crate::types::{AttributeValue, Attributes};

/// Protocol spoken with the CAS server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerType {
    Cas10,
    Cas20,
    Cas30,
    Saml11,
}

impl ServerType {
    /// Parse a CAS protocol version string such as `"2.0"`.
    #[must_use]
    pub fn from_version(version: &str) -> Option<Self> {
        match version.trim() {
            "1.0" => Some(Self::Cas10),
            "2.0" => Some(Self::Cas20),
            "3.0" => Some(Self::Cas30),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cas10 => "1.0",
            Self::Cas20 => "2.0",
            Self::Cas30 => "3.0",
            Self::Saml11 => "S1",
        }
    }
}

/// Whether the backend is initialized as a plain client or as a CAS proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    Client,
    Proxy,
}

/// Arguments for [`CasBackend::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParams {
    pub server_type: ServerType,
    pub hostname: String,
    pub port: u16,
    pub uri: String,
    /// Base URL (scheme, host, optional port) of this application.
    pub service_base_url: String,
    /// Allow the backend to rotate the session id (needed for single logout).
    pub change_session_id: bool,
}

impl ServerParams {
    /// `https://{hostname}:{port}{uri}`.
    ///
    /// # Errors
    ///
    /// Fails if the hostname or uri do not form a valid URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let uri = self.uri.trim_start_matches('/');
        let mut url = Url::parse(&format!("https://{}/", self.hostname))?;
        if url.set_port(Some(self.port)).is_err() {
            return Err(url::ParseError::InvalidPort);
        }
        url.join(uri)
    }
}

/// Query parameters sent to the CAS logout endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogoutParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl LogoutParams {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service.is_none() && self.url.is_none()
    }
}

/// Result of forcing authentication for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// The request carries a valid CAS session or ticket.
    Authenticated,
    /// The request must be sent to the CAS login page; nothing else should run.
    Redirect { location: String },
}

impl Authentication {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// CAS protocol implementation consumed by [`CasClient`](crate::CasClient).
///
/// Configuration methods are called once, in a fixed order, while the client
/// is built. Request methods receive the request head so the backend can
/// read tickets and its own session state.
#[async_trait]
pub trait CasBackend: Send + Sync + 'static {
    fn set_verbose(&self, verbose: bool);

    /// Initialize as client or proxy. Called exactly once.
    fn initialize(&self, mode: ClientMode, server: &ServerParams) -> Result<(), BoxError>;

    /// Accept single-logout requests, only from `allowed_hosts` when
    /// `check_client` is set.
    fn handle_logout_requests(&self, check_client: bool, allowed_hosts: &[String]);

    fn set_ca_cert(&self, cert_path: &str, validate_cn: bool) -> Result<(), BoxError>;

    fn set_no_validation(&self);

    fn set_login_url(&self, url: &str);

    fn set_fixed_service_url(&self, url: &str);

    fn set_logout_url(&self, url: &str);

    /// Validate the request or send it to the CAS login page.
    async fn force_authentication(&self, request: &Parts) -> Result<Authentication, BoxError>;

    /// The validated principal. Undefined before authentication completes.
    async fn user(&self, request: &Parts) -> Result<String, BoxError>;

    async fn attributes(&self, request: &Parts) -> Result<Attributes, BoxError>;

    async fn attribute(
        &self,
        request: &Parts,
        key: &str,
    ) -> Result<Option<AttributeValue>, BoxError>;

    async fn has_attribute(&self, request: &Parts, key: &str) -> Result<bool, BoxError>;

    /// Whether the backend's own session is authenticated (no ticket check).
    async fn is_session_authenticated(&self, request: &Parts) -> Result<bool, BoxError>;

    /// Local authentication check; may validate a ticket in the request.
    async fn is_authenticated(&self, request: &Parts) -> Result<bool, BoxError>;

    /// Gateway check against the CAS server. Unlike
    /// [`is_authenticated`](Self::is_authenticated) it tolerates a logout
    /// in progress.
    async fn check_authentication(&self, request: &Parts) -> Result<bool, BoxError>;

    /// End the CAS session. Returns the CAS logout URL to send the browser to.
    async fn logout(&self, request: &Parts, params: &LogoutParams) -> Result<String, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_type_from_version() {
        assert_eq!(ServerType::from_version("1.0"), Some(ServerType::Cas10));
        assert_eq!(ServerType::from_version(" 3.0 "), Some(ServerType::Cas30));
        assert_eq!(ServerType::from_version("S1"), None);
        assert_eq!(ServerType::Saml11.as_str(), "S1");
    }

    #[test]
    fn base_url_joins_host_port_and_uri() {
        let params = ServerParams {
            server_type: ServerType::Cas20,
            hostname: "cas.example.edu".into(),
            port: 8443,
            uri: "/cas".into(),
            service_base_url: String::new(),
            change_session_id: false,
        };
        assert_eq!(params.base_url().unwrap().as_str(), "https://cas.example.edu:8443/cas");

        let default_port = ServerParams { port: 443, ..params };
        assert_eq!(default_port.base_url().unwrap().as_str(), "https://cas.example.edu/cas");
    }

    #[test]
    fn logout_params_serialize_only_present_keys() {
        let params = LogoutParams { service: Some("https://app.example.edu".into()), url: None };
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"service":"https://app.example.edu"}"#
        );
        assert!(LogoutParams::default().is_empty());
    }
}
