use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use jobq_core::persist::ScopedStore;
use jobq_core::QueryEngine;

use crate::error::ApiError;
use crate::SharedState;

const MAX_SESSION_ID_LEN: usize = 64;

pub type SessionEngine = Arc<Mutex<QueryEngine>>;

/// Live engines, one per session id. Engines are created lazily on
/// first touch and restore any state a previous process persisted
/// under the same id.
#[derive(Default)]
pub struct SessionRegistry {
    engines: Mutex<HashMap<String, SessionEngine>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.engines.lock().await.len()
    }
}

/// Session ids become persistence key prefixes, so the charset is
/// restricted up front rather than trusting the store to sanitize.
pub fn validate_session_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return Err(ApiError::BadRequest(format!(
            "session id must be 1..={MAX_SESSION_ID_LEN} characters"
        )));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::BadRequest(
            "session id may only contain letters, digits, '-' and '_'".into(),
        ));
    }

    Ok(())
}

pub async fn session_engine(state: &SharedState, id: &str) -> Result<SessionEngine, ApiError> {
    validate_session_id(id)?;

    let mut engines = state.sessions.engines.lock().await;
    if let Some(engine) = engines.get(id) {
        return Ok(engine.clone());
    }

    debug!(session = id, "creating search session");
    let store = Arc::new(ScopedStore::new(state.store.clone(), id));
    let engine = Arc::new(Mutex::new(QueryEngine::new(
        state.cache.clone(),
        state.source.clone(),
        store,
        state.engine_config.clone(),
    )));
    engines.insert(id.to_string(), engine.clone());
    Ok(engine)
}
