//! Application startup: build the one CAS client and make it reachable.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::backend::CasBackend;
use crate::client::{CasClient, CasClientBuilder, LogoutStrategy};
use crate::config::{CasConfig, DEFAULT_CONFIG, LogTarget};
use crate::error::Error;
use crate::session::SessionEnvironment;

/// Key the client is registered under.
pub const CONTAINER_KEY: &str = "cas";

static REGISTERED: OnceLock<Arc<CasClient>> = OnceLock::new();

/// Builds the process-wide [`CasClient`] from configuration.
///
/// ```rust,ignore
/// let client = CasServiceProvider::new(CasConfig::from_env()?, Arc::new(MyBackend::new()))
///     .register()?;
/// ```
pub struct CasServiceProvider {
    builder: CasClientBuilder,
}

impl CasServiceProvider {
    #[must_use]
    pub fn new(config: CasConfig, backend: Arc<dyn CasBackend>) -> Self {
        Self {
            builder: CasClient::builder(config, backend),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, target: LogTarget) -> Self {
        self.builder = self.builder.with_logger(target);
        self
    }

    #[must_use]
    pub fn with_session_environment(mut self, session: Arc<dyn SessionEnvironment>) -> Self {
        self.builder = self.builder.with_session_environment(session);
        self
    }

    #[must_use]
    pub fn with_logout_strategy(mut self, strategy: Arc<dyn LogoutStrategy>) -> Self {
        self.builder = self.builder.with_logout_strategy(strategy);
        self
    }

    /// Build the shared client without registering it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend rejects its configuration.
    pub fn build(self) -> Result<Arc<CasClient>, Error> {
        self.builder.build().map(Arc::new)
    }

    /// Build the client and register it under [`CONTAINER_KEY`].
    ///
    /// Only object construction happens here; no request is authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] on a second call, or any error
    /// from [`build`](Self::build).
    pub fn register(self) -> Result<Arc<CasClient>, Error> {
        if REGISTERED.get().is_some() {
            return Err(Error::AlreadyRegistered(CONTAINER_KEY));
        }
        let client = self.build()?;
        REGISTERED
            .set(client.clone())
            .map_err(|_| Error::AlreadyRegistered(CONTAINER_KEY))?;

        tracing::info!(
            target: "cas",
            key = CONTAINER_KEY,
            masquerading = client.is_masquerading(),
            "CAS client registered"
        );
        Ok(client)
    }

    /// Keys this provider registers.
    #[must_use]
    pub fn provides() -> &'static [&'static str] {
        &[CONTAINER_KEY]
    }
}

/// The registered client, if any.
#[must_use]
pub fn registered() -> Option<Arc<CasClient>> {
    REGISTERED.get().cloned()
}

/// Write the default config file to `dest` unless a file is already there.
///
/// Returns whether the file was written.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or file cannot be written.
pub fn publish_config(dest: impl AsRef<Path>) -> Result<bool, Error> {
    let dest = dest.as_ref();
    if dest.exists() {
        tracing::debug!(target: "cas", path = %dest.display(), "CAS config already published");
        return Ok(false);
    }
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, DEFAULT_CONFIG)?;
    tracing::info!(target: "cas", path = %dest.display(), "Published CAS config");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Cas;
    use crate::testing::{CapturedLogs, Call, RecordingBackend, request_parts};

    #[test]
    fn build_constructs_without_authenticating() {
        let backend = Arc::new(RecordingBackend::new());
        let client = CasServiceProvider::new(CasConfig::default(), backend.clone())
            .build()
            .unwrap();

        assert!(!client.is_masquerading());
        assert_eq!(
            backend.count(|c| matches!(
                c,
                Call::ForceAuthentication | Call::IsAuthenticated | Call::CheckAuthentication
            )),
            0
        );
        assert_eq!(backend.count(|c| matches!(c, Call::Initialize(..))), 1);
    }

    // The only test that touches the process-wide registry.
    #[tokio::test]
    async fn register_once_and_reach_through_facade() {
        assert!(matches!(Cas::client(), Err(Error::NotRegistered("cas"))));

        let backend = Arc::new(RecordingBackend::new());
        let logs = CapturedLogs::new();
        let client = tracing::subscriber::with_default(logs.subscriber(), || {
            CasServiceProvider::new(CasConfig::default().with_masquerade("bob"), backend.clone())
                .register()
                .unwrap()
        });
        assert!(logs.contents().contains("cas: CAS client registered"));

        let again = CasServiceProvider::new(CasConfig::default(), backend.clone()).register();
        assert!(matches!(again, Err(Error::AlreadyRegistered("cas"))));

        assert!(Arc::ptr_eq(&client, &registered().unwrap()));
        assert!(Arc::ptr_eq(&client, &crate::facade::cas().unwrap()));
        assert_eq!(Cas::user(&request_parts("/")).await.unwrap(), "bob");
        assert!(Cas::is_masquerading().unwrap());
        assert_eq!(backend.count(|c| *c == Call::User), 0);
    }

    #[test]
    fn publish_config_writes_once() {
        let dir = std::env::temp_dir().join(format!("cas-connect-publish-{}", std::process::id()));
        let dest = dir.join("config").join("cas.json");
        let _ = std::fs::remove_dir_all(&dir);

        assert!(publish_config(&dest).unwrap());
        assert!(!publish_config(&dest).unwrap());

        let published = CasConfig::from_json_file(&dest).unwrap();
        assert_eq!(published, CasConfig::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn provides_the_container_key() {
        assert_eq!(CasServiceProvider::provides(), &["cas"]);
    }
}
