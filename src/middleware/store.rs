use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use ulid::Ulid;

use super::extractor::CasUser;
use super::traits::SessionStore;
use super::types::NewSession;
use crate::error::BoxError;
use crate::types::SessionId;

/// Process-local [`SessionStore`]. Sessions are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, NewSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> BoxError {
    "session store lock poisoned".into()
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<SessionId, BoxError> {
        let id = Ulid::new().to_string();
        self.sessions.write().map_err(poisoned)?.insert(id.clone(), session);
        Ok(SessionId(id))
    }

    async fn find(&self, session_id: &str) -> Result<Option<CasUser>, BoxError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).map(|s| CasUser {
            session_id: SessionId(session_id.to_owned()),
            user: s.user.clone(),
            attributes: s.attributes.clone(),
        }))
    }

    async fn delete(&self, session_id: &str) -> Result<(), BoxError> {
        self.sessions.write().map_err(poisoned)?.remove(session_id);
        Ok(())
    }
}
