//! Session Management
//!
//! In-memory store mapping session ids to form progress. Sessions are created
//! lazily on first use, expire after a period of inactivity and are capped in
//! number.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

use form_agent_agent::FormState;
use form_agent_config::SessionConfig;

use crate::ServerError;

/// One user's progress through the form
pub struct Session {
    /// Session ID
    pub id: String,
    /// Form progress; held for the whole step so requests on one session run
    /// one at a time
    pub state: Mutex<FormState>,
    /// Creation time
    pub created_at: Instant,
    /// Last activity
    pub last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(FormState::new()),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Check if session is expired
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(
            max_sessions,
            Duration::from_secs(3600),
            Duration::from_secs(300),
        )
    }

    /// Create a new session manager with custom timeout and cleanup interval
    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::with_config(
            config.max_sessions,
            Duration::from_secs(config.idle_timeout_secs),
            Duration::from_secs(config.cleanup_interval_secs),
        )
    }

    /// Start a background task that periodically removes expired sessions.
    ///
    /// Send `true` on the returned channel to stop it.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Session cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a session under a fresh id
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write();
        self.insert_new(&mut sessions, id)
    }

    /// Return the session for `id`, creating it on first use
    pub fn get_or_create(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        if let Some(session) = self.sessions.read().get(id) {
            session.touch();
            return Ok(Arc::clone(session));
        }

        let mut sessions = self.sessions.write();
        // Another request may have created it between the two locks
        if let Some(session) = sessions.get(id) {
            session.touch();
            return Ok(Arc::clone(session));
        }
        self.insert_new(&mut sessions, id.to_string())
    }

    fn insert_new(
        &self,
        sessions: &mut HashMap<String, Arc<Session>>,
        id: String,
    ) -> Result<Arc<Session>, ServerError> {
        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(sessions);

            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Session store full");
                return Err(ServerError::Capacity(format!(
                    "{} active sessions",
                    self.max_sessions
                )));
            }
        }

        let session = Arc::new(Session::new(id.clone()));
        sessions.insert(id.clone(), Arc::clone(&session));
        crate::metrics::record_active_sessions(sessions.len());

        tracing::info!(session_id = %id, "Created session");
        Ok(session)
    }

    /// Get session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Remove expired sessions, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let timeout = self.session_timeout;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let expired = session.is_expired(timeout);
            if expired {
                tracing::debug!(
                    session_id = %id,
                    age_secs = session.created_at.elapsed().as_secs(),
                    "Expired session"
                );
            }
            !expired
        });
        crate::metrics::record_active_sessions(sessions.len());
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();

        assert!(!session.is_expired(Duration::from_secs(60)));
        assert_eq!(manager.count(), 1);
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let manager = SessionManager::new(10);
        let first = manager.get_or_create("abc").unwrap();
        let second = manager.get_or_create("abc").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let manager = SessionManager::new(2);
        manager.get_or_create("a").unwrap();
        manager.get_or_create("b").unwrap();

        let err = manager.get_or_create("c").err().unwrap();
        assert!(matches!(err, ServerError::Capacity(_)));
        // Existing sessions stay reachable at capacity
        assert!(manager.get_or_create("a").is_ok());
    }

    #[test]
    fn test_expired_sessions_make_room() {
        let manager = SessionManager::with_config(1, Duration::ZERO, Duration::from_secs(60));
        manager.get_or_create("old").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        // "old" is purged to make room
        let new = manager.get_or_create("new").unwrap();
        assert_eq!(new.id, "new");
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let manager = SessionManager::with_config(10, Duration::ZERO, Duration::from_secs(60));
        manager.get_or_create("a").unwrap();
        manager.get_or_create("b").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(manager.cleanup_expired(), 2);
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_stops() {
        let manager = Arc::new(SessionManager::with_config(
            10,
            Duration::ZERO,
            Duration::from_millis(10),
        ));
        manager.get_or_create("a").unwrap();

        let shutdown = manager.start_cleanup_task();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.count(), 0);

        shutdown.send(true).unwrap();
    }
}
