use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{ClientMode, ServerParams, ServerType};
use crate::error::Error;
use crate::session::CookieParams;

/// Default CAS configuration file, published by
/// [`publish_config`](crate::provider::publish_config).
pub const DEFAULT_CONFIG: &str = include_str!("../config/cas.json");

#[derive(Clone, Copy)]
enum Kind {
    Str,
    Bool,
    Int,
    Port,
}

/// Every recognized option and how its environment value is decoded.
const OPTIONS: &[(&str, Kind)] = &[
    ("cas_hostname", Kind::Str),
    ("cas_port", Kind::Port),
    ("cas_uri", Kind::Str),
    ("cas_client_service", Kind::Str),
    ("cas_control_session", Kind::Bool),
    ("cas_proxy", Kind::Bool),
    ("cas_enable_saml", Kind::Bool),
    ("cas_version", Kind::Str),
    ("cas_validation", Kind::Str),
    ("cas_cert", Kind::Str),
    ("cas_validate_cn", Kind::Bool),
    ("cas_login_url", Kind::Str),
    ("cas_logout_url", Kind::Str),
    ("cas_logout_redirect", Kind::Str),
    ("cas_redirect_path", Kind::Str),
    ("cas_masquerade", Kind::Str),
    ("cas_session_name", Kind::Str),
    ("cas_session_lifetime", Kind::Int),
    ("cas_session_path", Kind::Str),
    ("cas_session_domain", Kind::Str),
    ("cas_session_secure", Kind::Bool),
    ("cas_session_httponly", Kind::Bool),
    ("cas_real_hosts", Kind::Str),
    ("cas_verbose_errors", Kind::Bool),
    ("cas_debug", Kind::Bool),
    ("cas_log", Kind::Str),
];

/// CAS server certificate validation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// No validation of the CAS server. Not safe outside development.
    None,
    /// Validate against a CA certificate bundle.
    Ca,
    /// Validate against the server's self-signed certificate.
    SelfSigned,
}

impl ValidationMode {
    /// Lenient parse: anything other than `ca` or `self` disables validation.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ca" => Self::Ca,
            "self" => Self::SelfSigned,
            _ => Self::None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ca => "ca",
            Self::SelfSigned => "self",
        }
    }
}

/// Where diagnostic lines from the `cas` tracing target end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// The host application's own subscriber.
    Host,
    /// A dedicated log file.
    File(PathBuf),
    /// Diagnostics are dropped.
    Disabled,
}

impl LogTarget {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self::Disabled
        } else if value.eq_ignore_ascii_case("host") || value.eq_ignore_ascii_case("tracing") {
            Self::Host
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

/// CAS configuration: user options merged over the default table.
///
/// Built once, before the client, and never mutated afterwards.
///
/// ```rust,ignore
/// use cas_connect::CasConfig;
///
/// let config = CasConfig::from_env()?
///     .with_hostname("cas.example.edu")
///     .with_masquerade("bob");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasConfig {
    #[serde(rename = "cas_hostname")]
    pub(crate) hostname: String,
    #[serde(rename = "cas_port")]
    pub(crate) port: u16,
    #[serde(rename = "cas_uri")]
    pub(crate) uri: String,
    #[serde(rename = "cas_client_service")]
    pub(crate) client_service: String,
    #[serde(rename = "cas_control_session")]
    pub(crate) control_session: bool,
    #[serde(rename = "cas_proxy")]
    pub(crate) proxy: bool,
    #[serde(rename = "cas_enable_saml")]
    pub(crate) enable_saml: bool,
    #[serde(rename = "cas_version")]
    pub(crate) version: String,
    #[serde(rename = "cas_validation")]
    pub(crate) validation: String,
    #[serde(rename = "cas_cert")]
    pub(crate) cert: String,
    #[serde(rename = "cas_validate_cn")]
    pub(crate) validate_cn: bool,
    #[serde(rename = "cas_login_url")]
    pub(crate) login_url: String,
    #[serde(rename = "cas_logout_url")]
    pub(crate) logout_url: String,
    #[serde(rename = "cas_logout_redirect")]
    pub(crate) logout_redirect: String,
    #[serde(rename = "cas_redirect_path")]
    pub(crate) redirect_path: String,
    #[serde(rename = "cas_masquerade")]
    pub(crate) masquerade: String,
    #[serde(rename = "cas_session_name")]
    pub(crate) session_name: String,
    #[serde(rename = "cas_session_lifetime")]
    pub(crate) session_lifetime: i64,
    #[serde(rename = "cas_session_path")]
    pub(crate) session_path: String,
    #[serde(rename = "cas_session_domain")]
    pub(crate) session_domain: String,
    #[serde(rename = "cas_session_secure")]
    pub(crate) session_secure: bool,
    #[serde(rename = "cas_session_httponly")]
    pub(crate) session_httponly: bool,
    #[serde(rename = "cas_real_hosts")]
    pub(crate) real_hosts: String,
    #[serde(rename = "cas_verbose_errors")]
    pub(crate) verbose_errors: bool,
    #[serde(rename = "cas_debug")]
    pub(crate) debug: bool,
    #[serde(rename = "cas_log")]
    pub(crate) log: String,
    /// Options this crate does not recognize. Kept, never read.
    #[serde(flatten)]
    pub(crate) extra: BTreeMap<String, Value>,
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 443,
            uri: "/cas".into(),
            client_service: String::new(),
            control_session: false,
            proxy: false,
            enable_saml: true,
            version: "2.0".into(),
            validation: String::new(),
            cert: String::new(),
            validate_cn: true,
            login_url: String::new(),
            logout_url: "https://cas.myuniv.edu/cas/logout".into(),
            logout_redirect: String::new(),
            redirect_path: String::new(),
            masquerade: String::new(),
            session_name: "CASAuth".into(),
            session_lifetime: 7200,
            session_path: "/".into(),
            session_domain: String::new(),
            session_secure: false,
            session_httponly: true,
            real_hosts: String::new(),
            verbose_errors: false,
            debug: false,
            log: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl CasConfig {
    /// Overlay a partial set of `cas_*` options onto the defaults.
    ///
    /// Omitted keys take their default. Unknown keys are preserved in
    /// [`extra`](Self::extra). `null` counts as omitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a recognized option has the wrong type.
    pub fn from_options(mut options: Map<String, Value>) -> Result<Self, Error> {
        options.retain(|key, value| !(value.is_null() && is_option(key)));
        serde_json::from_value(Value::Object(options)).map_err(|e| Error::Config(e.to_string()))
    }

    /// Parse a JSON object of options (the published config file format).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is not a JSON object or an
    /// option has the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("cas config: {e}")))?;
        match value {
            Value::Object(options) => Self::from_options(options),
            _ => Err(Error::Config("cas config must be a JSON object".into())),
        }
    }

    /// Load a published config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Config`]
    /// if it does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Create config from `CAS_*` environment variables.
    ///
    /// Each option `cas_foo` is read from `CAS_FOO`. Unset variables keep
    /// their default. Booleans accept `1/0`, `true/false`, `yes/no`, `on/off`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the variable if a boolean or integer
    /// value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Map::new();
        for &(key, kind) in OPTIONS {
            let var = key.to_ascii_uppercase();
            let Some(raw) = lookup(&var) else {
                continue;
            };
            let value = match kind {
                Kind::Str => Value::String(raw),
                Kind::Bool => Value::Bool(
                    parse_bool(&raw).ok_or_else(|| {
                        Error::Config(format!("{var}: expected a boolean, got '{raw}'"))
                    })?,
                ),
                Kind::Int => Value::from(
                    raw.trim()
                        .parse::<i64>()
                        .map_err(|e| Error::Config(format!("{var}: {e}")))?,
                ),
                Kind::Port => Value::from(
                    raw.trim()
                        .parse::<u16>()
                        .map_err(|e| Error::Config(format!("{var}: {e}")))?,
                ),
            };
            options.insert(key.to_owned(), value);
        }
        Self::from_options(options)
    }

    /// Names of every recognized option.
    pub fn option_names() -> impl Iterator<Item = &'static str> {
        OPTIONS.iter().map(|(key, _)| *key)
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    #[must_use]
    pub fn with_client_service(mut self, url: impl Into<String>) -> Self {
        self.client_service = url.into();
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn with_saml(mut self, enabled: bool) -> Self {
        self.enable_saml = enabled;
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn with_validation(mut self, mode: ValidationMode, cert: impl Into<String>) -> Self {
        self.validation = match mode {
            ValidationMode::None => String::new(),
            _ => mode.as_str().into(),
        };
        self.cert = cert.into();
        self
    }

    #[must_use]
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    #[must_use]
    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = url.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, url: impl Into<String>) -> Self {
        self.logout_redirect = url.into();
        self
    }

    #[must_use]
    pub fn with_redirect_path(mut self, path: impl Into<String>) -> Self {
        self.redirect_path = path.into();
        self
    }

    #[must_use]
    pub fn with_masquerade(mut self, user: impl Into<String>) -> Self {
        self.masquerade = user.into();
        self
    }

    #[must_use]
    pub fn with_real_hosts(mut self, hosts: impl Into<String>) -> Self {
        self.real_hosts = hosts.into();
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_secure(mut self, secure: bool) -> Self {
        self.session_secure = secure;
        self
    }

    #[must_use]
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    #[must_use]
    pub fn with_log(mut self, target: impl Into<String>) -> Self {
        self.log = target.into();
        self
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &str {
        &self.logout_url
    }

    /// Fixed service URL, or `None` when the service URL is derived per request.
    #[must_use]
    pub fn redirect_path(&self) -> Option<&str> {
        non_empty(&self.redirect_path)
    }

    /// Default `service` for logout when the caller passes none.
    #[must_use]
    pub fn logout_redirect(&self) -> Option<&str> {
        non_empty(&self.logout_redirect)
    }

    /// Masquerade identity, or `None` when real CAS authentication is used.
    #[must_use]
    pub fn masquerade(&self) -> Option<&str> {
        non_empty(&self.masquerade)
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn saml_enabled(&self) -> bool {
        self.enable_saml
    }

    #[must_use]
    pub fn verbose_errors(&self) -> bool {
        self.verbose_errors
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn validation(&self) -> ValidationMode {
        ValidationMode::parse(&self.validation)
    }

    #[must_use]
    pub fn cert(&self) -> &str {
        &self.cert
    }

    #[must_use]
    pub fn validate_cn(&self) -> bool {
        self.validate_cn
    }

    #[must_use]
    pub fn client_mode(&self) -> ClientMode {
        if self.proxy {
            ClientMode::Proxy
        } else {
            ClientMode::Client
        }
    }

    /// SAML 1.1 when SAML is enabled, else the configured CAS version.
    ///
    /// An unrecognized version is replaced by CAS 2.0; the client reports it
    /// when diagnostics are enabled.
    #[must_use]
    pub fn server_type(&self) -> ServerType {
        if self.enable_saml {
            return ServerType::Saml11;
        }
        ServerType::from_version(&self.version).unwrap_or(ServerType::Cas20)
    }

    /// Whether `cas_version` is unrecognized and replaced by CAS 2.0.
    #[must_use]
    pub fn version_fallback(&self) -> bool {
        !self.enable_saml && ServerType::from_version(&self.version).is_none()
    }

    /// Hosts allowed to send single-logout requests.
    #[must_use]
    pub fn trusted_hosts(&self) -> Vec<String> {
        self.real_hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_owned)
            .collect()
    }

    #[must_use]
    pub fn log_target(&self) -> LogTarget {
        LogTarget::parse(&self.log)
    }

    #[must_use]
    pub fn server_params(&self) -> ServerParams {
        ServerParams {
            server_type: self.server_type(),
            hostname: self.hostname.clone(),
            port: self.port,
            uri: self.uri.clone(),
            service_base_url: self.client_service.clone(),
            change_session_id: self.control_session,
        }
    }

    #[must_use]
    pub fn cookie_params(&self) -> CookieParams {
        CookieParams {
            lifetime_secs: self.session_lifetime,
            path: self.session_path.clone(),
            domain: non_empty(&self.session_domain).map(str::to_owned),
            secure: self.session_secure,
            http_only: self.session_httponly,
        }
    }

    /// Unrecognized options supplied by the caller.
    #[must_use]
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}

fn is_option(key: &str) -> bool {
    OPTIONS.iter().any(|(name, _)| *name == key)
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
