//! In-memory session registry with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::models::Session;

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::minutes(ttl_minutes.max(1)),
        }
    }

    pub fn create(&self) -> (Uuid, SharedSession) {
        self.evict_expired();
        let session = Session::new();
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().insert(id, Arc::clone(&shared));
        info!("Session {id} created");
        (id, shared)
    }

    /// Looks up a live session and refreshes its idle timer.
    pub fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        let shared = self
            .sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

        let expired = {
            let mut session = shared.lock();
            if self.is_expired(&session) && !session.is_busy() {
                true
            } else {
                session.touch();
                false
            }
        };

        if expired {
            self.sessions.write().remove(&id);
            info!("Session {id} expired");
            return Err(AppError::NotFound(format!("Session {id} not found")));
        }
        Ok(shared)
    }

    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    /// Drops idle sessions past the TTL. Sessions with a running operation are kept.
    pub fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, shared| {
            let session = shared.lock();
            session.is_busy() || !self.is_expired(&session)
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} expired sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    fn is_expired(&self, session: &Session) -> bool {
        Utc::now() - session.last_seen > self.ttl
    }
}
