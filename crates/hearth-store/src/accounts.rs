//! Accounts and the embedded session registry.
//!
//! Accounts are created by registration and never mutated or deleted.
//! Sessions share the accounts lock but are never persisted.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hearth_crypto::{generate_token, CredentialHasher};
use hearth_types::{
    require_non_empty, Account, AccountId, Clock, CredentialHash, IdSequence, Session,
    SessionToken, SystemClock, TypeError,
};

use crate::codec::{LoadStatus, SnapshotFile, SnapshotState};
use crate::durable::DurableStore;
use crate::error::{PersistResult, StoreError, StoreResult};
use crate::flush::FlushTrigger;
use crate::sessions::SessionRegistry;
use crate::traits::{AccountDirectory, Flush};

/// Default session validity window.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Persisted accounts collection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AccountsState {
    accounts: Vec<Account>,
    next_id: IdSequence,
    #[serde(skip)]
    sessions: SessionRegistry,
}

impl AccountsState {
    /// Accounts in registration order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// The id the next registration receives.
    pub fn next_id(&self) -> u64 {
        self.next_id.peek()
    }

    fn find(&self, display_name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.display_name == display_name)
    }

    fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

impl SnapshotState for AccountsState {
    const KIND: &'static str = "accounts";

    fn reconcile(&mut self) {
        for account in &self.accounts {
            self.next_id.observe(account.id.get());
        }
    }
}

/// Credentials for the administrator seeded into a fresh account store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapAdmin {
    pub display_name: String,
    pub secret: String,
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            display_name: "admin".into(),
            secret: "admin".into(),
        }
    }
}

/// Construction options for [`AccountStore`].
#[derive(Clone)]
pub struct AccountStoreOptions {
    pub hasher: CredentialHasher,
    pub clock: Arc<dyn Clock>,
    pub session_ttl: Duration,
    /// Seeded only when no account snapshot exists.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AccountStoreOptions {
    fn default() -> Self {
        Self {
            hasher: CredentialHasher::default(),
            clock: Arc::new(SystemClock),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            bootstrap_admin: Some(BootstrapAdmin::default()),
        }
    }
}

/// Account store with embedded session registry.
pub struct AccountStore {
    store: DurableStore<AccountsState>,
    hasher: CredentialHasher,
    /// Verified against when a login names no account, so a miss costs as
    /// much as a wrong secret.
    decoy: CredentialHash,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AccountStore {
    /// Load accounts from `file`. If the file does not exist the bootstrap
    /// administrator, if configured, is created.
    pub fn open(file: SnapshotFile, options: AccountStoreOptions) -> StoreResult<(Self, LoadStatus)> {
        let (store, status) = DurableStore::open(file);
        let bootstrap = options.bootstrap_admin.clone();
        let this = Self::with_store(store, options)?;
        if status.is_missing() {
            if let Some(admin) = bootstrap {
                this.seed_admin(&admin)?;
            }
        }
        Ok((this, status))
    }

    /// An account store with no backing file, seeded like a fresh one.
    pub fn in_memory(options: AccountStoreOptions) -> StoreResult<Self> {
        let bootstrap = options.bootstrap_admin.clone();
        let this = Self::with_store(DurableStore::in_memory(AccountsState::default()), options)?;
        if let Some(admin) = bootstrap {
            this.seed_admin(&admin)?;
        }
        Ok(this)
    }

    fn with_store(
        store: DurableStore<AccountsState>,
        options: AccountStoreOptions,
    ) -> StoreResult<Self> {
        let decoy = options.hasher.hash(generate_token().as_str())?;
        Ok(Self {
            store,
            hasher: options.hasher,
            decoy,
            clock: options.clock,
            session_ttl: options.session_ttl,
        })
    }

    fn seed_admin(&self, admin: &BootstrapAdmin) -> StoreResult<Account> {
        let account = self.insert(&admin.display_name, &admin.secret, true)?;
        info!(account = %account.id, name = %account.display_name, "bootstrap administrator created");
        Ok(account)
    }

    /// Create a regular account. Display names are unique and case-sensitive.
    pub fn register(&self, display_name: &str, secret: &str) -> StoreResult<Account> {
        require_non_empty("display name", display_name)?;
        if secret.is_empty() {
            return Err(TypeError::EmptyField { field: "secret" }.into());
        }
        let account = self.insert(display_name, secret, false)?;
        info!(account = %account.id, name = %account.display_name, "account registered");
        Ok(account)
    }

    fn insert(&self, display_name: &str, secret: &str, is_admin: bool) -> StoreResult<Account> {
        // Fail fast before paying for the hash; re-checked under the lock.
        if self.store.read(|s| s.find(display_name).is_some()) {
            return Err(StoreError::Conflict(display_name.to_string()));
        }
        let credential = self.hasher.hash(secret)?;

        self.store.mutate(|s| {
            if s.find(display_name).is_some() {
                return Err(StoreError::Conflict(display_name.to_string()));
            }
            let account = Account {
                id: AccountId::new(s.next_id.allocate()?),
                display_name: display_name.to_string(),
                credential,
                is_admin,
            };
            s.accounts.push(account.clone());
            Ok(account)
        })
    }

    /// Verify credentials and open a new session.
    pub fn login(&self, display_name: &str, secret: &str) -> StoreResult<Session> {
        let Some(account) = self.store.read(|s| s.find(display_name).cloned()) else {
            let _ = self.hasher.verify(secret, &self.decoy);
            debug!("login rejected: unknown name");
            return Err(StoreError::InvalidCredentials);
        };

        let verified = match self.hasher.verify(secret, &account.credential) {
            Ok(verified) => verified,
            Err(e) => {
                warn!(account = %account.id, error = %e, "stored credential unusable");
                false
            }
        };
        if !verified {
            debug!(account = %account.id, "login rejected");
            return Err(StoreError::InvalidCredentials);
        }

        let session = Session {
            token: generate_token(),
            account_id: account.id,
            display_name: account.display_name,
            is_admin: account.is_admin,
            expires_at: self.clock.now() + self.session_ttl,
        };
        self.store
            .mutate_volatile(|s| s.sessions.insert(session.clone()));
        debug!(account = %session.account_id, token = session.token.fingerprint(), "session opened");
        Ok(session)
    }

    /// The live session for `token`, or `Unauthenticated` if it is absent
    /// or expired. Does not evict expired entries.
    pub fn resolve(&self, token: &SessionToken) -> StoreResult<Session> {
        let now = self.clock.now();
        self.store
            .read(|s| s.sessions.resolve(token, now).cloned())
            .ok_or(StoreError::Unauthenticated)
    }

    /// End a session. Unknown tokens are ignored. Returns whether a session
    /// was removed.
    pub fn invalidate(&self, token: &SessionToken) -> bool {
        let removed = self.store.mutate_volatile(|s| s.sessions.invalidate(token));
        if removed {
            debug!(token = token.fingerprint(), "session closed");
        }
        removed
    }

    /// Evict every expired session. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        self.store.mutate_volatile(|s| s.sessions.sweep_expired(now))
    }

    /// Number of registry entries, including expired ones not yet swept.
    pub fn session_count(&self) -> usize {
        self.store.read(|s| s.sessions.len())
    }

    pub fn get(&self, id: AccountId) -> Option<Account> {
        self.store.read(|s| s.get(id).cloned())
    }

    pub fn find_by_name(&self, display_name: &str) -> Option<Account> {
        self.store.read(|s| s.find(display_name).cloned())
    }

    /// All accounts in registration order.
    pub fn list(&self) -> Vec<Account> {
        self.store.read(|s| s.accounts.clone())
    }

    pub fn len(&self) -> usize {
        self.store.read(|s| s.accounts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot_path(&self) -> Option<&std::path::Path> {
        self.store.snapshot_path()
    }
}

impl Flush for AccountStore {
    fn label(&self) -> &'static str {
        AccountsState::KIND
    }

    fn flush(&self) -> PersistResult<()> {
        self.store.flush()
    }

    fn flush_trigger(&self) -> FlushTrigger {
        self.store.trigger().clone()
    }
}

impl AccountDirectory for AccountStore {
    fn display_name(&self, id: AccountId) -> Option<String> {
        self.store.read(|s| s.get(id).map(|a| a.display_name.clone()))
    }
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("store", &self.store)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
