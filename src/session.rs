use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::favorites::FavoritesSet;
use crate::query::QueryManager;

/// One browser session: its own query state and favorites.
pub struct Session {
    pub id: String,
    pub query: QueryManager,
    pub favorites: RwLock<FavoritesSet>,
    last_used: Mutex<Instant>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn touch(&self) {
        if let Ok(mut last_used) = self.last_used.lock() {
            *last_used = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Too many active sessions (limit {0}), try again later")]
    Full(usize),
}

pub struct SessionRepo {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    catalog: Arc<dyn Catalog>,
    debounce: Duration,
    idle_timeout: Duration,
    max_active: usize,
}

impl SessionRepo {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        debounce: Duration,
        idle_timeout: Duration,
        max_active: usize,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            catalog,
            debounce,
            idle_timeout,
            max_active,
        }
    }

    /// Start a session and kick off the default listing. Refused once
    /// `max_active` sessions are live.
    pub async fn create(&self) -> Result<Arc<Session>, SessionError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            if sessions.len() >= self.max_active {
                warn!(active = sessions.len(), "Refusing new session, limit reached");
                return Err(SessionError::Full(self.max_active));
            }

            let id = uuid::Uuid::new_v4().to_string();
            let session = Arc::new(Session {
                id: id.clone(),
                query: QueryManager::spawn(self.catalog.clone(), self.debounce),
                favorites: RwLock::new(FavoritesSet::new()),
                last_used: Mutex::new(Instant::now()),
            });
            sessions.insert(id.clone(), session.clone());
            info!(session = %id, active = sessions.len(), "Created session");
            session
        };

        if let Err(e) = session.query.refresh().await {
            warn!("Failed to start listing for session {}: {}", session.id, e);
        }
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id).cloned()?;
        session.touch();
        Some(session)
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            info!(session = %id, "Removed session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle longer than the timeout. Returns how many went.
    pub async fn expire_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.idle_for() < self.idle_timeout;
            if !keep {
                debug!(session = %id, "Expiring idle session");
            }
            keep
        });
        before - sessions.len()
    }

    pub fn start_background_expiry(self: Arc<Self>, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                let expired = self.expire_idle().await;
                if expired > 0 {
                    info!("Expired {} idle sessions", expired);
                }
            }
        });
    }
}
