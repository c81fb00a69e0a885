//! Ownership and access rules.
//!
//! Each rule is a pure function of the actor and the record. Stores call
//! them on every access; nothing is cached.
//!
//! | Record  | Action          | Allowed for                     |
//! |---------|-----------------|---------------------------------|
//! | todo    | any mutation    | owner, administrator            |
//! | post    | view / comment  | anyone if public, else owner    |
//! | post    | update / delete | owner only (no admin override)  |
//! | comment | delete          | comment author, post author     |

use hearth_types::{Actor, BlogPost, Comment, TodoItem};

/// The outcome of an access decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    /// Returns `true` if the decision is `Allow`.
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

/// Todos may be read and mutated by their owner or any administrator.
pub fn todo_access(actor: &Actor, todo: &TodoItem) -> Access {
    Access::from_bool(actor.is_admin || actor.is(todo.owner_id))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Public posts are visible to everyone; private posts only to their owner.
/// Commenting follows the same rule.
pub fn post_view_access(actor: &Actor, post: &BlogPost) -> Access {
    Access::from_bool(!post.private || actor.is(post.owner_id))
}

/// Only the owner may update or delete a post.
pub fn post_mutation_access(actor: &Actor, post: &BlogPost) -> Access {
    Access::from_bool(actor.is(post.owner_id))
}

/// A comment may be deleted by whoever wrote it or by the author of the post
/// it belongs to.
pub fn comment_delete_access(actor: &Actor, post: &BlogPost, comment: &Comment) -> Access {
    Access::from_bool(actor.is(comment.author_id) || actor.is(post.owner_id))
}
