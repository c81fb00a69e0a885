use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, CommentId, PostId};

/// A blog post with its comment thread.
///
/// Comments are kept in insertion order, which is also display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: PostId,
    pub owner_id: AccountId,
    /// Owner display name, copied at creation time.
    pub owner_name: String,
    pub title: String,
    pub body: String,
    /// Private posts are visible only to their owner.
    pub private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl BlogPost {
    /// Position of a comment within the thread.
    pub fn comment_index(&self, id: CommentId) -> Option<usize> {
        self.comments.iter().position(|c| c.id == id)
    }
}

/// A comment on a blog post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: AccountId,
    /// Author display name, copied at creation time.
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub private: bool,
}

impl NewPost {
    pub fn public(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            private: false,
        }
    }

    pub fn private(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            private: true,
        }
    }
}

/// Replacement values for a post's editable fields.
///
/// An update overwrites title, body and privacy together.
pub type PostUpdate = NewPost;

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64) -> Comment {
        Comment {
            id: CommentId::new(id),
            post_id: PostId::new(1),
            author_id: AccountId::new(1),
            author_name: "alice".into(),
            body: format!("c{id}"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn comment_index_finds_position() {
        let now = Utc::now();
        let post = BlogPost {
            id: PostId::new(1),
            owner_id: AccountId::new(1),
            owner_name: "alice".into(),
            title: "t".into(),
            body: "b".into(),
            private: false,
            created_at: now,
            updated_at: now,
            comments: vec![comment(3), comment(7)],
        };
        assert_eq!(post.comment_index(CommentId::new(7)), Some(1));
        assert_eq!(post.comment_index(CommentId::new(4)), None);
    }

    #[test]
    fn missing_comments_field_defaults_empty() {
        let json = serde_json::json!({
            "id": 1,
            "owner_id": 2,
            "owner_name": "bob",
            "title": "t",
            "body": "b",
            "private": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });
        let post: BlogPost = serde_json::from_value(json).unwrap();
        assert!(post.comments.is_empty());
    }

    #[test]
    fn new_post_constructors() {
        assert!(!NewPost::public("a", "b").private);
        assert!(NewPost::private("a", "b").private);
    }
}
