//! Foundation types for Hearth.
//!
//! Every other Hearth crate depends on `hearth-types`. It holds the records
//! the stores manage and the identifiers that tie them together, and nothing
//! that touches disk or locks.
//!
//! # Key Types
//!
//! - [`Account`] / [`CredentialHash`]: registered identities
//! - [`Session`] / [`SessionToken`]: time-bounded logins
//! - [`Actor`]: the identity an operation runs as
//! - [`TodoItem`]: todo entries with two-phase deletion
//! - [`BlogPost`] / [`Comment`]: posts with an ordered comment thread
//! - [`IdSequence`]: monotonic identifier allocation
//! - [`Clock`]: wall-clock seam

pub mod account;
pub mod blog;
pub mod error;
pub mod ids;
pub mod session;
pub mod temporal;
pub mod todo;

pub use account::{Account, Actor, CredentialHash};
pub use blog::{BlogPost, Comment, NewPost, PostUpdate};
pub use error::{require_non_empty, TypeError};
pub use ids::{AccountId, CommentId, IdSequence, PostId, TodoId};
pub use session::{Session, SessionToken};
pub use temporal::{Clock, ManualClock, SystemClock};
pub use todo::TodoItem;

/// Display name recorded when a record's owner cannot be resolved.
pub const UNKNOWN_ACCOUNT_NAME: &str = "unknown";
