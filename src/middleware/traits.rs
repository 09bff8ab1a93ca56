use std::future::Future;

use super::extractor::CasUser;
use super::types::NewSession;
use crate::error::BoxError;
use crate::types::SessionId;

/// Consumer-provided session persistence.
///
/// Holds the principal validated by CAS so later requests are answered
/// without contacting the CAS server. Sessions are identified by opaque
/// IDs; the consumer chooses the format (ULID, UUID, etc.).
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MyAppState {
///     async fn create(&self, session: NewSession) -> Result<SessionId, BoxError> {
///         let id = Ulid::new().to_string();
///         self.db.insert_session(&id, &session).await?;
///         Ok(SessionId(id))
///     }
///
///     async fn find(&self, session_id: &str) -> Result<Option<CasUser>, BoxError> {
///         self.db.find_session(session_id).await
///     }
///
///     async fn delete(&self, session_id: &str) -> Result<(), BoxError> {
///         self.db.delete_session(session_id).await
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Create a new session. Returns the session ID.
    fn create(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<SessionId, BoxError>> + Send;

    /// Look up a session by ID. `None` if unknown or expired.
    fn find(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<CasUser>, BoxError>> + Send;

    /// Delete a session (logout).
    fn delete(&self, session_id: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}
