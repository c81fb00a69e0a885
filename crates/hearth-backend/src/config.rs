use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hearth_crypto::CredentialCost;
use hearth_store::BootstrapAdmin;

use crate::error::{BackendError, BackendResult};

/// Snapshot file for accounts inside the data directory.
pub const ACCOUNTS_FILE: &str = "accounts.json";
/// Snapshot file for todos inside the data directory.
pub const TODOS_FILE: &str = "todos.json";
/// Snapshot file for blogs inside the data directory.
pub const BLOGS_FILE: &str = "blogs.json";

/// Upper bound on the session validity window (ten years).
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Backend configuration. Every field has a default, so an empty TOML file
/// is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Directory holding the snapshot files. Created if absent.
    pub data_dir: PathBuf,
    /// Seconds between autosave ticks.
    pub autosave_interval_secs: u64,
    /// Milliseconds a flusher waits after a mutation before writing.
    pub flush_debounce_ms: u64,
    /// Session validity window in seconds.
    pub session_ttl_secs: u64,
    /// Whether to create the bootstrap administrator when no account
    /// snapshot exists.
    pub seed_admin: bool,
    pub bootstrap_admin: BootstrapAdmin,
    /// Cost of newly created credential hashes.
    pub credentials: CredentialCost,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            autosave_interval_secs: 300,
            flush_debounce_ms: 250,
            session_ttl_secs: 24 * 60 * 60,
            seed_admin: true,
            bootstrap_admin: BootstrapAdmin::default(),
            credentials: CredentialCost::default(),
        }
    }
}

impl BackendConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(raw: &str) -> BackendResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| BackendError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> BackendResult<String> {
        toml::to_string_pretty(self).map_err(|e| BackendError::Config(e.to_string()))
    }

    pub fn validate(&self) -> BackendResult<()> {
        if self.autosave_interval_secs == 0 {
            return Err(BackendError::Config(
                "autosave_interval_secs must be greater than zero".into(),
            ));
        }
        if self.session_ttl_secs == 0 {
            return Err(BackendError::Config(
                "session_ttl_secs must be greater than zero".into(),
            ));
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(BackendError::Config(format!(
                "session_ttl_secs must be at most {MAX_SESSION_TTL_SECS}"
            )));
        }
        if self.seed_admin
            && (self.bootstrap_admin.display_name.trim().is_empty()
                || self.bootstrap_admin.secret.is_empty())
        {
            return Err(BackendError::Config(
                "bootstrap_admin needs a display_name and a secret".into(),
            ));
        }
        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn flush_debounce(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_FILE)
    }

    pub fn todos_path(&self) -> PathBuf {
        self.data_dir.join(TODOS_FILE)
    }

    pub fn blogs_path(&self) -> PathBuf {
        self.data_dir.join(BLOGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = BackendConfig::default();
        assert_eq!(c.data_dir, PathBuf::from("data"));
        assert_eq!(c.autosave_interval(), Duration::from_secs(300));
        assert_eq!(c.flush_debounce(), Duration::from_millis(250));
        assert_eq!(c.session_ttl(), chrono::Duration::hours(24));
        assert!(c.seed_admin);
        assert_eq!(c.bootstrap_admin.display_name, "admin");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(BackendConfig::from_toml_str("").unwrap(), BackendConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = BackendConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/hearth"
            autosave_interval_secs = 60

            [bootstrap_admin]
            display_name = "root"
            secret = "s3cret"

            [credentials]
            memory_kib = 8
            iterations = 1
            parallelism = 1
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/hearth"));
        assert_eq!(c.autosave_interval_secs, 60);
        assert_eq!(c.flush_debounce_ms, 250);
        assert_eq!(c.bootstrap_admin.display_name, "root");
        assert_eq!(c.credentials, CredentialCost::minimal());
        assert_eq!(c.accounts_path(), PathBuf::from("/var/lib/hearth/accounts.json"));
    }

    #[test]
    fn zero_interval_rejected() {
        let err = BackendConfig::from_toml_str("autosave_interval_secs = 0").unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
        assert!(BackendConfig::from_toml_str("session_ttl_secs = 0").is_err());
        assert!(BackendConfig::from_toml_str("session_ttl_secs = 999999999999").is_err());
    }

    #[test]
    fn empty_bootstrap_rejected_only_when_seeding() {
        let raw = "[bootstrap_admin]\ndisplay_name = \"\"\nsecret = \"\"";
        assert!(BackendConfig::from_toml_str(raw).is_err());
        let raw = format!("seed_admin = false\n{raw}");
        assert!(BackendConfig::from_toml_str(&raw).is_ok());
    }

    #[test]
    fn unknown_types_rejected() {
        assert!(BackendConfig::from_toml_str("autosave_interval_secs = \"soon\"").is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let c = BackendConfig::with_data_dir("/tmp/h");
        let back = BackendConfig::from_toml_str(&c.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, "flush_debounce_ms = 0\n").unwrap();
        let c = BackendConfig::load(&path).unwrap();
        assert_eq!(c.flush_debounce(), Duration::ZERO);

        let missing = BackendConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(BackendError::Config(_))));
    }
}
