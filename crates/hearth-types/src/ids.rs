use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw numeric value.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an [`Account`](crate::Account).
    AccountId,
    "account"
);
numeric_id!(
    /// Identifier of a [`TodoItem`](crate::TodoItem).
    TodoId,
    "todo"
);
numeric_id!(
    /// Identifier of a [`BlogPost`](crate::BlogPost).
    PostId,
    "post"
);
numeric_id!(
    /// Identifier of a [`Comment`](crate::Comment). Unique across every post
    /// in a store, not per post.
    CommentId,
    "comment"
);

/// Monotonic identifier allocator.
///
/// Starts at 1 and increases by one per allocation. Values are never handed
/// out twice, even after the record that carried them is deleted. The
/// sequence is persisted alongside its collection as the next value to hand
/// out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    /// A fresh sequence whose first allocation is 1.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// The value the next call to [`allocate`](Self::allocate) returns.
    pub const fn peek(&self) -> u64 {
        self.next
    }

    /// Hand out the next value.
    pub fn allocate(&mut self) -> Result<u64, TypeError> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(TypeError::IdSpaceExhausted)?;
        Ok(id)
    }

    /// Raise the sequence so it never returns `seen` or anything below it.
    ///
    /// Used after loading a snapshot whose stored counter lags behind the
    /// identifiers it actually contains.
    pub fn observe(&mut self, seen: u64) {
        if seen >= self.next {
            self.next = seen.saturating_add(1);
        }
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one() {
        let mut seq = IdSequence::new();
        assert_eq!(seq.allocate().unwrap(), 1);
        assert_eq!(seq.allocate().unwrap(), 2);
        assert_eq!(seq.peek(), 3);
    }

    #[test]
    fn observe_only_moves_forward() {
        let mut seq = IdSequence { next: 5 };
        seq.observe(2);
        assert_eq!(seq.peek(), 5);
        seq.observe(9);
        assert_eq!(seq.peek(), 10);
    }

    #[test]
    fn exhausted_sequence_errors() {
        let mut seq = IdSequence { next: u64::MAX };
        assert_eq!(seq.allocate(), Err(TypeError::IdSpaceExhausted));
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&TodoId::new(7)).unwrap();
        assert_eq!(json, "7");
        let seq: IdSequence = serde_json::from_str("12").unwrap();
        assert_eq!(seq.peek(), 12);
    }

    #[test]
    fn display_carries_kind() {
        assert_eq!(AccountId::new(3).to_string(), "account#3");
        assert_eq!(format!("{:?}", CommentId::new(4)), "CommentId(4)");
    }
}
