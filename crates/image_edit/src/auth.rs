use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// Opaque session lookup. Guarded tools only ask whether a token maps to a live session.
pub trait SessionProvider: Send + Sync {
    fn session(&self, token: &str) -> Option<Session>;
}

/// Process-local sessions keyed by token
#[derive(Debug)]
pub struct InMemorySessions {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    next_id: AtomicU64,
}

impl Default for InMemorySessions {
    fn default() -> Self {
        Self::new(Duration::days(30))
    }
}

impl InMemorySessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            next_id: AtomicU64::new(0),
        }
    }

    /// Open a session for `name` and return its token.
    /// Expired sessions are purged on the way.
    pub fn sign_in(&self, name: impl Into<String>) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            user: User {
                id: format!("user-{}", id),
                name: name.into(),
            },
            expires: now + self.ttl,
        };
        info!("Signed in {}", session.user.name);

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, existing| !existing.is_expired(now));
        if sessions.len() < before {
            debug!("Purged {} expired sessions", before - sessions.len());
        }
        sessions.insert(token.clone(), session);
        token
    }

    /// Drop the session; returns whether one existed
    pub fn sign_out(&self, token: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token);
        if let Some(session) = &removed {
            info!("Signed out {}", session.user.name);
        }
        removed.is_some()
    }
}

impl SessionProvider for InMemorySessions {
    fn session(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            let session = sessions.get(token)?;
            if !session.is_expired(now) {
                return Some(session.clone());
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = sessions.remove(token) {
            debug!("Session for {} has expired", session.user.name);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_then_lookup() {
        let sessions = InMemorySessions::default();
        let token = sessions.sign_in("Ada");

        let session = sessions.session(&token).unwrap();
        assert_eq!(session.user.name, "Ada");
        assert!(sessions.session("unknown").is_none());
    }

    #[test]
    fn test_tokens_are_random_v4_uuids() {
        let sessions = InMemorySessions::default();
        let first = sessions.sign_in("a");
        let second = sessions.sign_in("b");
        assert_ne!(first, second);

        for token in [&first, &second] {
            let parsed = Uuid::parse_str(token).unwrap();
            assert_eq!(parsed.get_version_num(), 4);
        }
        // No shared counter or clock prefix between consecutive tokens
        assert_ne!(&first[..8], &second[..8]);
    }

    #[test]
    fn test_sign_out_revokes() {
        let sessions = InMemorySessions::default();
        let token = sessions.sign_in("Ada");

        assert!(sessions.sign_out(&token));
        assert!(sessions.session(&token).is_none());
        assert!(!sessions.sign_out(&token));
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let sessions = InMemorySessions::new(Duration::seconds(-1));
        let token = sessions.sign_in("Ada");
        assert!(sessions.session(&token).is_none());
    }

    #[test]
    fn test_expired_session_is_removed_on_lookup() {
        let sessions = InMemorySessions::new(Duration::seconds(-1));
        let token = sessions.sign_in("Ada");

        assert!(sessions.session(&token).is_none());
        assert!(!sessions.sessions.read().unwrap().contains_key(&token));
        assert!(!sessions.sign_out(&token));
    }

    #[test]
    fn test_sign_in_purges_expired_sessions() {
        let sessions = InMemorySessions::new(Duration::seconds(-1));
        let stale = [sessions.sign_in("a"), sessions.sign_in("b")];
        let latest = sessions.sign_in("c");

        let map = sessions.sessions.read().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&latest));
        assert!(stale.iter().all(|token| !map.contains_key(token)));
    }
}
