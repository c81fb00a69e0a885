//! Cryptographic primitives for Hearth.
//!
//! Provides salted argon2id credential hashing with constant-time
//! verification, unguessable session tokens drawn from the OS random source,
//! and domain-separated BLAKE3 digests used to check snapshot integrity.

pub mod error;
pub mod hasher;
pub mod password;
pub mod token;

pub use error::CryptoError;
pub use hasher::{ContentHasher, Digest};
pub use password::{CredentialCost, CredentialHasher};
pub use token::{generate_token, TOKEN_BYTES};
