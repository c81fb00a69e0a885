use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Actor;
use crate::ids::AccountId;

/// Opaque bearer token identifying a session.
///
/// `Debug` shows only a short prefix; `Display` is intentionally not
/// implemented so tokens are not formatted into log lines by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an already-encoded token string.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded token, for handing to the client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short, non-secret prefix for diagnostics.
    pub fn fingerprint(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(6)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}…)", self.fingerprint())
    }
}

/// A logged-in session.
///
/// Display name and admin flag are copied from the account at login and are
/// not re-resolved afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub account_id: AccountId,
    pub display_name: String,
    pub is_admin: bool,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns `true` once `now` has passed the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The identity this session grants.
    pub fn actor(&self) -> Actor {
        Actor {
            account_id: self.account_id,
            display_name: self.display_name.clone(),
            is_admin: self.is_admin,
        }
    }
}
