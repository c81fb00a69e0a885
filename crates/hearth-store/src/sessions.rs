use std::collections::HashMap;

use chrono::{DateTime, Utc};

use hearth_types::{Session, SessionToken};

/// Live sessions keyed by token.
///
/// Embedded in the accounts state and guarded by the accounts store lock.
/// Never persisted: a restart logs everyone out.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionToken, Session>,
}

impl SessionRegistry {
    /// Register a session under its token.
    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.token.clone(), session);
    }

    /// The session for `token` if it is present and not expired at `now`.
    ///
    /// Read-only: an expired entry is reported as absent but left in place
    /// for [`sweep_expired`](Self::sweep_expired).
    pub fn resolve(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<&Session> {
        self.sessions
            .get(token)
            .filter(|session| !session.is_expired_at(now))
    }

    /// Remove a session. Returns whether it was present.
    pub fn invalidate(&mut self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every session expired at `now`. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hearth_types::AccountId;

    fn session(token: &str, account: u64, expires_at: DateTime<Utc>) -> Session {
        Session {
            token: SessionToken::new(token),
            account_id: AccountId::new(account),
            display_name: format!("user{account}"),
            is_admin: false,
            expires_at,
        }
    }

    #[test]
    fn resolve_live_session() {
        let now = Utc::now();
        let mut reg = SessionRegistry::default();
        reg.insert(session("t1", 1, now + Duration::hours(24)));
        let found = reg.resolve(&SessionToken::new("t1"), now).unwrap();
        assert_eq!(found.account_id, AccountId::new(1));
        assert!(reg.resolve(&SessionToken::new("t2"), now).is_none());
    }

    #[test]
    fn expired_session_is_invalid_but_retained() {
        let now = Utc::now();
        let mut reg = SessionRegistry::default();
        reg.insert(session("t1", 1, now));
        let later = now + Duration::seconds(1);
        let token = SessionToken::new("t1");
        assert!(reg.resolve(&token, later).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let now = Utc::now();
        let mut reg = SessionRegistry::default();
        reg.insert(session("t1", 1, now + Duration::hours(1)));
        let token = SessionToken::new("t1");
        assert!(reg.invalidate(&token));
        assert!(!reg.invalidate(&token));
        assert!(reg.resolve(&token, now).is_none());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let now = Utc::now();
        let mut reg = SessionRegistry::default();
        reg.insert(session("old", 1, now - Duration::minutes(1)));
        reg.insert(session("fresh", 1, now + Duration::minutes(1)));
        reg.insert(session("other", 2, now + Duration::minutes(1)));

        assert_eq!(reg.sweep_expired(now), 1);
        assert_eq!(reg.len(), 2);
        assert!(reg.resolve(&SessionToken::new("fresh"), now).is_some());
        assert!(reg.resolve(&SessionToken::new("other"), now).is_some());
        // Sweeping again finds nothing.
        assert_eq!(reg.sweep_expired(now), 0);
    }

    #[test]
    fn multiple_sessions_per_account() {
        let now = Utc::now();
        let mut reg = SessionRegistry::default();
        reg.insert(session("a", 3, now + Duration::hours(1)));
        reg.insert(session("b", 3, now + Duration::hours(1)));
        assert_eq!(reg.len(), 2);
        assert!(reg.invalidate(&SessionToken::new("a")));
        let b = reg.resolve(&SessionToken::new("b"), now).unwrap();
        assert_eq!(b.account_id, AccountId::new(3));
    }
}
