use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, TodoId};

/// A todo item.
///
/// Deletion is two-phase. [`mark_deleted`](Self::mark_deleted) is the soft
/// delete: the item stays in its store, flagged both deleted and completed.
/// Only a soft-deleted item may then be removed for good.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub owner_id: AccountId,
    /// Owner display name, copied at creation time.
    pub owner_name: String,
    pub title: String,
    pub completed: bool,
    pub deleted: bool,
}

impl TodoItem {
    /// A fresh, open item.
    pub fn new(
        id: TodoId,
        owner_id: AccountId,
        owner_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_id,
            owner_name: owner_name.into(),
            title: title.into(),
            completed: false,
            deleted: false,
        }
    }

    /// Flip the completed flag.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    /// Soft delete: sets both `deleted` and `completed`.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.completed = true;
    }
}
