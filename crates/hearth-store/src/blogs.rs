//! Blog posts and their comments.
//!
//! A private post is invisible to everyone but its owner: every path that
//! would reveal it to another actor reports `NotFound`, so the existence of
//! a private post is never leaked. A visible post that the actor may not
//! mutate reports `Forbidden`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hearth_types::{
    require_non_empty, AccountId, Actor, BlogPost, Clock, Comment, CommentId, IdSequence, NewPost,
    PostId, PostUpdate,
};

use crate::codec::{LoadStatus, SnapshotFile, SnapshotState};
use crate::durable::DurableStore;
use crate::error::{PersistResult, StoreError, StoreResult};
use crate::flush::FlushTrigger;
use crate::policy::{comment_delete_access, post_mutation_access, post_view_access};
use crate::traits::{AccountDirectory, Flush};

const POST: &str = "post";
const COMMENT: &str = "comment";

/// Persisted blog collection. Comment ids come from one counter shared by
/// every post.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BlogsState {
    posts: Vec<BlogPost>,
    next_id: IdSequence,
    next_comment_id: IdSequence,
}

impl BlogsState {
    pub fn posts(&self) -> &[BlogPost] {
        &self.posts
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.peek()
    }

    pub fn next_comment_id(&self) -> u64 {
        self.next_comment_id.peek()
    }

    /// Index of a post the actor can see.
    fn visible_index(&self, actor: &Actor, id: PostId) -> StoreResult<usize> {
        self.posts
            .iter()
            .position(|p| p.id == id && post_view_access(actor, p).is_allowed())
            .ok_or_else(|| StoreError::not_found(POST, id.get()))
    }

    /// Index of a post the actor can see and mutate.
    fn owned_index(&self, actor: &Actor, id: PostId) -> StoreResult<usize> {
        let i = self.visible_index(actor, id)?;
        if !post_mutation_access(actor, &self.posts[i]).is_allowed() {
            return Err(StoreError::forbidden(POST, id.get()));
        }
        Ok(i)
    }
}

impl SnapshotState for BlogsState {
    const KIND: &'static str = "blogs";

    fn reconcile(&mut self) {
        for post in &self.posts {
            self.next_id.observe(post.id.get());
            for comment in &post.comments {
                self.next_comment_id.observe(comment.id.get());
            }
        }
    }
}

pub struct BlogStore {
    store: DurableStore<BlogsState>,
    directory: Arc<dyn AccountDirectory>,
    clock: Arc<dyn Clock>,
}

impl BlogStore {
    pub fn open(
        file: SnapshotFile,
        directory: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
    ) -> (Self, LoadStatus) {
        let (store, status) = DurableStore::open(file);
        (
            Self {
                store,
                directory,
                clock,
            },
            status,
        )
    }

    pub fn in_memory(directory: Arc<dyn AccountDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DurableStore::in_memory(BlogsState::default()),
            directory,
            clock,
        }
    }

    pub fn create(&self, owner: AccountId, post: NewPost) -> StoreResult<BlogPost> {
        require_non_empty("title", &post.title)?;
        let owner_name = self.directory.display_name_or_unknown(owner);
        let now = self.clock.now();

        let created = self.store.mutate(|s| {
            let created = BlogPost {
                id: PostId::new(s.next_id.allocate()?),
                owner_id: owner,
                owner_name,
                title: post.title,
                body: post.body,
                private: post.private,
                created_at: now,
                updated_at: now,
                comments: Vec::new(),
            };
            s.posts.push(created.clone());
            Ok(created)
        })?;
        debug!(post = %created.id, owner = %owner, private = created.private, "post created");
        Ok(created)
    }

    /// Every public post, oldest first.
    pub fn list_public(&self) -> Vec<BlogPost> {
        self.store
            .read(|s| s.posts.iter().filter(|p| !p.private).cloned().collect())
    }

    /// Posts by `author` as `viewer` sees them: private posts only when the
    /// viewer is the author.
    pub fn list_by_author(&self, viewer: &Actor, author: AccountId) -> Vec<BlogPost> {
        self.store.read(|s| {
            s.posts
                .iter()
                .filter(|p| p.owner_id == author && post_view_access(viewer, p).is_allowed())
                .cloned()
                .collect()
        })
    }

    pub fn get(&self, viewer: &Actor, id: PostId) -> StoreResult<BlogPost> {
        self.store
            .read(|s| s.visible_index(viewer, id).map(|i| s.posts[i].clone()))
    }

    /// Replace title, body and privacy, refreshing the update timestamp.
    pub fn update(&self, actor: &Actor, id: PostId, update: PostUpdate) -> StoreResult<BlogPost> {
        require_non_empty("title", &update.title)?;
        let now = self.clock.now();
        self.store.mutate(|s| {
            let i = s.owned_index(actor, id)?;
            let post = &mut s.posts[i];
            post.title = update.title;
            post.body = update.body;
            post.private = update.private;
            post.updated_at = now;
            Ok(post.clone())
        })
    }

    /// Remove a post together with its comments.
    pub fn delete(&self, actor: &Actor, id: PostId) -> StoreResult<BlogPost> {
        let removed = self.store.mutate(|s| {
            let i = s.owned_index(actor, id)?;
            Ok(s.posts.remove(i))
        })?;
        debug!(post = %removed.id, comments = removed.comments.len(), "post removed");
        Ok(removed)
    }

    /// Append a comment to a post the actor can see.
    pub fn add_comment(&self, actor: &Actor, post_id: PostId, body: &str) -> StoreResult<Comment> {
        require_non_empty("comment", body)?;
        let author_name = self.directory.display_name_or_unknown(actor.account_id);
        let now = self.clock.now();

        self.store.mutate(|s| {
            let i = s.visible_index(actor, post_id)?;
            let comment = Comment {
                id: CommentId::new(s.next_comment_id.allocate()?),
                post_id,
                author_id: actor.account_id,
                author_name,
                body: body.to_string(),
                created_at: now,
            };
            s.posts[i].comments.push(comment.clone());
            Ok(comment)
        })
    }

    /// Comments of a visible post in insertion order.
    pub fn list_comments(&self, viewer: &Actor, post_id: PostId) -> StoreResult<Vec<Comment>> {
        self.store.read(|s| {
            s.visible_index(viewer, post_id)
                .map(|i| s.posts[i].comments.clone())
        })
    }

    /// Remove a comment. Allowed for the comment's author and the post's
    /// author.
    pub fn delete_comment(
        &self,
        actor: &Actor,
        post_id: PostId,
        comment_id: CommentId,
    ) -> StoreResult<Comment> {
        self.store.mutate(|s| {
            let i = s.visible_index(actor, post_id)?;
            let post = &mut s.posts[i];
            let c = post
                .comment_index(comment_id)
                .ok_or_else(|| StoreError::not_found(COMMENT, comment_id.get()))?;
            if !comment_delete_access(actor, post, &post.comments[c]).is_allowed() {
                return Err(StoreError::forbidden(COMMENT, comment_id.get()));
            }
            Ok(post.comments.remove(c))
        })
    }

    pub fn len(&self) -> usize {
        self.store.read(|s| s.posts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot_path(&self) -> Option<&std::path::Path> {
        self.store.snapshot_path()
    }
}

impl Flush for BlogStore {
    fn label(&self) -> &'static str {
        BlogsState::KIND
    }

    fn flush(&self) -> PersistResult<()> {
        self.store.flush()
    }

    fn flush_trigger(&self) -> FlushTrigger {
        self.store.trigger().clone()
    }
}

impl std::fmt::Debug for BlogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogStore")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
