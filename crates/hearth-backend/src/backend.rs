use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hearth_crypto::CredentialHasher;
use hearth_store::{
    run_flusher, AccountDirectory, AccountStore, AccountStoreOptions, BlogStore, Flush,
    LoadStatus, SnapshotFile, StoreResult, TodoStore,
};
use hearth_types::{Actor, Clock, SessionToken, SystemClock};

use crate::autosave::{flush_each, AutosaveHandle, AutosaveScheduler, FlushOutcome};
use crate::config::BackendConfig;
use crate::error::BackendResult;

/// The three stores, explicitly constructed and shared by handle.
#[derive(Clone, Debug)]
pub struct Stores {
    pub accounts: Arc<AccountStore>,
    pub todos: Arc<TodoStore>,
    pub blogs: Arc<BlogStore>,
}

impl Stores {
    /// Every store as a flush target, in flush order.
    pub fn flush_targets(&self) -> Vec<Arc<dyn Flush>> {
        vec![
            self.accounts.clone() as Arc<dyn Flush>,
            self.todos.clone() as Arc<dyn Flush>,
            self.blogs.clone() as Arc<dyn Flush>,
        ]
    }
}

/// How each store's state was obtained at startup.
#[derive(Debug)]
pub struct LoadReport {
    pub accounts: LoadStatus,
    pub todos: LoadStatus,
    pub blogs: LoadStatus,
}

/// The application backing store: every store wired to its snapshot file.
pub struct Backend {
    config: BackendConfig,
    stores: Stores,
    load_report: LoadReport,
}

impl Backend {
    /// Open every store under `config.data_dir` using the system clock.
    pub fn open(config: &BackendConfig) -> BackendResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open every store with an explicit clock.
    pub fn open_with_clock(config: &BackendConfig, clock: Arc<dyn Clock>) -> BackendResult<Self> {
        config.validate()?;
        if let Err(error) = std::fs::create_dir_all(&config.data_dir) {
            // Each flush retries creating it.
            warn!(data_dir = %config.data_dir.display(), %error, "could not create data directory");
        }

        let options = AccountStoreOptions {
            hasher: CredentialHasher::new(config.credentials)?,
            clock: Arc::clone(&clock),
            session_ttl: config.session_ttl(),
            bootstrap_admin: config
                .seed_admin
                .then(|| config.bootstrap_admin.clone()),
        };
        let (accounts, accounts_status) =
            AccountStore::open(SnapshotFile::new(config.accounts_path()), options)?;
        let accounts = Arc::new(accounts);
        let directory: Arc<dyn AccountDirectory> = accounts.clone();

        let (todos, todos_status) =
            TodoStore::open(SnapshotFile::new(config.todos_path()), Arc::clone(&directory));
        let (blogs, blogs_status) =
            BlogStore::open(SnapshotFile::new(config.blogs_path()), directory, clock);

        let load_report = LoadReport {
            accounts: accounts_status,
            todos: todos_status,
            blogs: blogs_status,
        };
        for (store, status) in [
            ("accounts", &load_report.accounts),
            ("todos", &load_report.todos),
            ("blogs", &load_report.blogs),
        ] {
            if let LoadStatus::Recovered { error, .. } = status {
                warn!(store, %error, "store started empty after a load failure");
            }
        }

        let stores = Stores {
            accounts,
            todos: Arc::new(todos),
            blogs: Arc::new(blogs),
        };
        info!(
            data_dir = %config.data_dir.display(),
            accounts = stores.accounts.len(),
            todos = stores.todos.len(),
            posts = stores.blogs.len(),
            "backend opened"
        );

        Ok(Self {
            config: config.clone(),
            stores,
            load_report,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.stores.accounts
    }

    pub fn todos(&self) -> &Arc<TodoStore> {
        &self.stores.todos
    }

    pub fn blogs(&self) -> &Arc<BlogStore> {
        &self.stores.blogs
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Resolve a session token to the acting identity.
    pub fn authenticate(&self, token: &SessionToken) -> StoreResult<Actor> {
        self.stores.accounts.resolve(token).map(|s| s.actor())
    }

    /// Synchronously flush every store in order.
    pub fn flush_all(&self) -> FlushOutcome {
        flush_each(&self.stores.flush_targets())
    }

    /// Spawn one debounced flusher per store. They stop when `shutdown`
    /// turns `true`.
    pub fn spawn_flushers(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let debounce = self.config.flush_debounce();
        self.stores
            .flush_targets()
            .into_iter()
            .map(|target| tokio::spawn(run_flusher(target, debounce, shutdown.clone())))
            .collect()
    }

    /// Start autosave, session sweeping and the per-store flushers. The
    /// returned handle's `shutdown` stops all of them and performs the
    /// final flush.
    pub fn start_background(&self) -> AutosaveHandle {
        let mut handle =
            AutosaveScheduler::new(self.stores.flush_targets(), self.config.autosave_interval())
                .sweep_sessions(Arc::clone(&self.stores.accounts))
                .start();
        for flusher in self.spawn_flushers(handle.shutdown_signal()) {
            handle.attach(flusher);
        }
        handle
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("data_dir", &self.config.data_dir)
            .field("stores", &self.stores)
            .finish()
    }
}
