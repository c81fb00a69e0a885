use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// A salted, memory-hard credential hash in PHC string format.
///
/// The plaintext secret is never stored. `Debug` output is redacted so the
/// hash does not end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Wrap an encoded PHC string.
    pub fn from_phc(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded PHC string.
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(<redacted>)")
    }
}

/// A registered account.
///
/// Created only through registration and never mutated or deleted afterwards.
/// Display names are unique and compared case-sensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub credential: CredentialHash,
    pub is_admin: bool,
}

/// The identity an operation is performed as.
///
/// Built from a resolved session. The display name and admin flag are the
/// values copied into the session at login time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Actor {
    pub account_id: AccountId,
    pub display_name: String,
    pub is_admin: bool,
}

impl Actor {
    /// A regular, non-administrator actor.
    pub fn member(account_id: AccountId, display_name: impl Into<String>) -> Self {
        Self {
            account_id,
            display_name: display_name.into(),
            is_admin: false,
        }
    }

    /// An administrator actor.
    pub fn admin(account_id: AccountId, display_name: impl Into<String>) -> Self {
        Self {
            account_id,
            display_name: display_name.into(),
            is_admin: true,
        }
    }

    /// Returns `true` if this actor is the given account.
    pub fn is(&self, account: AccountId) -> bool {
        self.account_id == account
    }
}

impl From<&Account> for Actor {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            display_name: account.display_name.clone(),
            is_admin: account.is_admin,
        }
    }
}
