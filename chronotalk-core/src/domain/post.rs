//! Post and comment domain models

use serde::{Deserialize, Serialize};

use super::category::Category;
use super::user::User;

/// A feed entry
///
/// `timestamp` is epoch milliseconds. Feed order is insertion order
/// (newest first), which may disagree with `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    pub author: User,
    pub timestamp: i64,
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: Category,
        author: User,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category,
            author,
            timestamp,
            likes: 0,
            comments: Vec::new(),
        }
    }

    /// Case-insensitive substring match on title or content
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.content.to_lowercase().contains(&needle)
    }
}

/// A reply appended to a post; never edited or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: User,
    pub content: String,
    pub timestamp: i64,
    #[serde(default)]
    pub is_ai_generated: bool,
}

/// A comment together with the post it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthoredComment {
    pub post_id: String,
    pub post_title: String,
    pub comment: Comment,
}
