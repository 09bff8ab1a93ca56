use crate::types::Attributes;

/// Principal of a freshly validated CAS session.
///
/// Passed to [`SessionStore::create`](super::SessionStore::create) for the consumer to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// CAS user name (or the masquerade identity).
    pub user: String,
    /// Attributes released by the CAS server at login.
    pub attributes: Attributes,
}
