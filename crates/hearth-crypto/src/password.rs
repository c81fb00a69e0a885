//! Credential hashing.
//!
//! Secrets are hashed with argon2id under a fresh random salt and stored as
//! PHC strings, which carry the algorithm, cost and salt alongside the hash.
//! Verification reads the parameters back out of the stored string, so
//! changing the configured cost never invalidates existing credentials.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use hearth_types::CredentialHash;

use crate::error::CryptoError;

/// Salt length in bytes.
pub const SALT_BYTES: usize = 16;

/// Work factors for new credential hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl CredentialCost {
    /// The cheapest parameters argon2 accepts. Only for tests.
    pub const fn minimal() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: Params::MIN_T_COST,
            parallelism: Params::MIN_P_COST,
        }
    }
}

impl Default for CredentialCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes and verifies account secrets.
#[derive(Clone)]
pub struct CredentialHasher {
    argon: Argon2<'static>,
    cost: CredentialCost,
}

impl CredentialHasher {
    /// Build a hasher for the given cost.
    pub fn new(cost: CredentialCost) -> Result<Self, CryptoError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| CryptoError::Hashing(e.to_string()))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            cost,
        })
    }

    /// Hash a secret under a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<CredentialHash, CryptoError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| CryptoError::Hashing(e.to_string()))?;
        let hash = self
            .argon
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| CryptoError::Hashing(e.to_string()))?;
        Ok(CredentialHash::from_phc(hash.to_string()))
    }

    /// Check a secret against a stored hash in constant time.
    ///
    /// Returns `Ok(false)` on mismatch and `Err` only when the stored hash
    /// cannot be parsed or evaluated.
    pub fn verify(&self, secret: &str, stored: &CredentialHash) -> Result<bool, CryptoError> {
        let parsed = PasswordHash::new(stored.as_phc())
            .map_err(|e| CryptoError::MalformedHash(e.to_string()))?;
        match self.argon.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CryptoError::Hashing(e.to_string())),
        }
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon: Argon2::default(),
            cost: CredentialCost::default(),
        }
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("cost", &self.cost)
            .finish()
    }
}
