/// Boxed error returned by consumer-provided implementations
/// ([`CasBackend`](crate::CasBackend), `SessionStore`).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An option could not be decoded into its typed form.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The CAS backend failed. The backend's own error is kept as the source.
    #[error("CAS backend error during {operation}")]
    Backend {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("a CAS client is already registered under \"{0}\"")]
    AlreadyRegistered(&'static str),

    #[error("no CAS client registered under \"{0}\"")]
    NotRegistered(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn backend(operation: &'static str) -> impl FnOnce(BoxError) -> Self {
        move |source| Self::Backend { operation, source }
    }
}
