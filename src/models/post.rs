use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Private,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Private => "private",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            "private" => Ok(PostStatus::Private),
            _ => Err(ValidationError::InvalidFormat("status".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    /// Author identity, always taken from the verified access token
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub views: i32,
    pub likes: i32,
    pub thumbnail: String,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_title: String,
    pub meta_description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Validated input shared by create and update
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub thumbnail: String,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_title: String,
    pub meta_description: String,
}

impl NewPost {
    /// A published post always carries a publication date.
    pub fn publication_date(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.status, self.published_at) {
            (PostStatus::Published, None) => Some(now),
            (_, published_at) => published_at,
        }
    }

    pub fn into_post(self, id: i64, now: DateTime<Utc>) -> Post {
        let published_at = self.publication_date(now);
        Post {
            id,
            user_id: self.user_id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            excerpt: self.excerpt,
            status: self.status,
            category_id: self.category_id,
            tags: self.tags,
            views: 0,
            likes: 0,
            thumbnail: self.thumbnail,
            published_at,
            meta_title: self.meta_title,
            meta_description: self.meta_description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

impl Post {
    /// Applies editable fields from `changes`. Author, counters and the
    /// creation time are kept; an existing publication date is never cleared.
    pub fn apply(&mut self, changes: NewPost, now: DateTime<Utc>) {
        let published_at = match changes.published_at.or(self.published_at) {
            None if changes.status == PostStatus::Published => Some(now),
            existing => existing,
        };
        self.title = changes.title;
        self.slug = changes.slug;
        self.content = changes.content;
        self.excerpt = changes.excerpt;
        self.status = changes.status;
        self.category_id = changes.category_id;
        self.tags = changes.tags;
        self.thumbnail = changes.thumbnail;
        self.meta_title = changes.meta_title;
        self.meta_description = changes.meta_description;
        self.published_at = published_at;
        self.updated_at = now;
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published && self.deleted_at.is_none()
    }

    /// Display date: publication date, falling back to creation date.
    pub fn display_date(&self) -> String {
        self.published_at
            .unwrap_or(self.created_at)
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Row in the public post listing
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub tags: Vec<String>,
    pub date: String,
    pub excerpt: String,
    pub views: i32,
    pub likes: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thumbnail: String,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            date: post.display_date(),
            id: post.id,
            title: post.title,
            tags: post.tags,
            excerpt: post.excerpt,
            views: post.views,
            likes: post.likes,
            thumbnail: post.thumbnail,
        }
    }
}

/// Reader-facing article page
#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub title: String,
    /// Markdown source
    pub content: String,
    pub date: String,
    pub tags: Vec<String>,
    /// Category name, not id
    pub category: String,
    pub views: i32,
    pub likes: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub meta_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub meta_description: String,
}

impl PostDetail {
    pub fn new(post: Post, category: String) -> Self {
        Self {
            date: post.display_date(),
            id: post.id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            category,
            views: post.views,
            likes: post.likes,
            excerpt: post.excerpt,
            meta_title: post.meta_title,
            meta_description: post.meta_description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HotPost {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub date: String,
    pub excerpt: String,
}

impl HotPost {
    pub fn new(post: Post, category: String) -> Self {
        Self {
            date: post.created_at.format("%Y-%m-%d").to_string(),
            id: post.id,
            title: post.title,
            category,
            excerpt: post.excerpt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatestPost {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub category: String,
}

impl LatestPost {
    pub fn new(post: Post, category: String) -> Self {
        Self {
            date: post.created_at.format("%Y-%m-%d").to_string(),
            id: post.id,
            title: post.title,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_post(status: PostStatus) -> NewPost {
        NewPost {
            user_id: Uuid::new_v4(),
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            content: "# Hello".to_string(),
            excerpt: String::new(),
            status,
            category_id: Uuid::new_v4(),
            tags: vec!["rust".to_string()],
            thumbnail: String::new(),
            published_at: None,
            meta_title: String::new(),
            meta_description: String::new(),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("draft".parse::<PostStatus>().unwrap(), PostStatus::Draft);
        assert_eq!(
            "published".parse::<PostStatus>().unwrap(),
            PostStatus::Published
        );
        assert!("archived".parse::<PostStatus>().is_err());
    }

    #[test]
    fn test_publishing_sets_publication_date() {
        let now = Utc.with_ymd_and_hms(2025, 12, 15, 9, 0, 0).unwrap();
        let post = new_post(PostStatus::Published).into_post(1, now);

        assert_eq!(post.published_at, Some(now));
        assert_eq!(post.display_date(), "2025-12-15");
    }

    #[test]
    fn test_draft_has_no_publication_date() {
        let post = new_post(PostStatus::Draft).into_post(1, Utc::now());
        assert!(post.published_at.is_none());
        assert!(!post.is_published());
    }

    #[test]
    fn test_apply_keeps_author_and_publication_date() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut post = new_post(PostStatus::Published).into_post(7, created);
        let author = post.user_id;

        let mut changes = new_post(PostStatus::Published);
        changes.title = "Edited".to_string();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        post.apply(changes, later);

        assert_eq!(post.title, "Edited");
        assert_eq!(post.user_id, author);
        assert_eq!(post.published_at, Some(created));
        assert_eq!(post.updated_at, later);
    }
}
