use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Mutex;
use uuid::Uuid;

use super::lock;
use crate::error::{AppError, DatabaseError};
use crate::models::{NewPost, Post, PostStatus};

/// Posts. Soft-deleted rows are invisible to every read.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, AppError>;
    async fn find(&self, id: i64) -> Result<Option<Post>, AppError>;
    async fn update(&self, post: &Post) -> Result<(), AppError>;
    /// Returns false if there was no live post with that id.
    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError>;
    /// Published posts, newest publication first
    async fn list_published(&self) -> Result<Vec<Post>, AppError>;
    /// Published posts with the most views
    async fn most_viewed(&self, limit: usize) -> Result<Vec<Post>, AppError>;
    /// Most recently created published posts
    async fn latest(&self, limit: usize) -> Result<Vec<Post>, AppError>;
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    user_id: Uuid,
    title: String,
    slug: String,
    content: String,
    excerpt: String,
    status: String,
    category_id: Uuid,
    tags: Vec<String>,
    views: i32,
    likes: i32,
    thumbnail: String,
    published_at: Option<DateTime<Utc>>,
    meta_title: String,
    meta_description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<PostStatus>().map_err(|_| {
            DatabaseError::UnexpectedError(format!("post {} has unknown status {}", row.id, row.status))
        })?;
        Ok(Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            status,
            category_id: row.category_id,
            tags: row.tags,
            views: row.views,
            likes: row.likes,
            thumbnail: row.thumbnail,
            published_at: row.published_at,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

const POST_COLUMNS: &str = "id, user_id, title, slug, content, excerpt, status, category_id, \
     tags, views, likes, thumbnail, published_at, meta_title, meta_description, \
     created_at, updated_at, deleted_at";

fn into_posts(rows: Vec<PostRow>) -> Result<Vec<Post>, AppError> {
    rows.into_iter().map(Post::try_from).collect()
}

pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_published(&self, order_by: &str, limit: Option<usize>) -> Result<Vec<Post>, AppError> {
        let limit = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
        let query = format!(
            "SELECT {} FROM posts WHERE deleted_at IS NULL AND status = 'published' ORDER BY {}{}",
            POST_COLUMNS, order_by, limit
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .fetch_all(&self.pool)
            .await?;
        into_posts(rows)
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(&self, post: NewPost) -> Result<Post, AppError> {
        let now = Utc::now();
        let published_at = post.publication_date(now);
        let query = format!(
            r#"
            INSERT INTO posts
                (user_id, title, slug, content, excerpt, status, category_id, tags,
                 thumbnail, published_at, meta_title, meta_description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING {}
            "#,
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(post.user_id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(post.status.as_str())
            .bind(post.category_id)
            .bind(&post.tags)
            .bind(&post.thumbnail)
            .bind(published_at)
            .bind(&post.meta_title)
            .bind(&post.meta_description)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Post::try_from(row)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, AppError> {
        let query = format!(
            "SELECT {} FROM posts WHERE id = $1 AND deleted_at IS NULL",
            POST_COLUMNS
        );
        sqlx::query_as::<_, PostRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Post::try_from)
            .transpose()
    }

    async fn update(&self, post: &Post) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, slug = $3, content = $4, excerpt = $5, status = $6,
                category_id = $7, tags = $8, thumbnail = $9, published_at = $10,
                meta_title = $11, meta_description = $12, updated_at = $13
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(post.status.as_str())
        .bind(post.category_id)
        .bind(&post.tags)
        .bind(&post.thumbnail)
        .bind(post.published_at)
        .bind(&post.meta_title)
        .bind(&post.meta_description)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("post {}", post.id)).into());
        }
        Ok(())
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE posts SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_published(&self) -> Result<Vec<Post>, AppError> {
        self.fetch_published("published_at DESC NULLS LAST, id DESC", None)
            .await
    }

    async fn most_viewed(&self, limit: usize) -> Result<Vec<Post>, AppError> {
        self.fetch_published("views DESC, id DESC", Some(limit)).await
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Post>, AppError> {
        self.fetch_published("created_at DESC, id DESC", Some(limit))
            .await
    }
}

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<Vec<Post>>,
}

impl InMemoryPostStore {
    fn published_sorted_by<K: Ord>(&self, key: impl Fn(&Post) -> K, limit: Option<usize>) -> Vec<Post> {
        let mut posts: Vec<Post> = lock(&self.posts)
            .iter()
            .filter(|post| post.is_published())
            .cloned()
            .collect();
        posts.sort_by(|a, b| key(b).cmp(&key(a)).then(b.id.cmp(&a.id)));
        posts.truncate(limit.unwrap_or(usize::MAX));
        posts
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn create(&self, post: NewPost) -> Result<Post, AppError> {
        let mut posts = lock(&self.posts);
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "post slug {} already exists",
                post.slug
            ))
            .into());
        }
        let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let post = post.into_post(id, Utc::now());
        posts.push(post.clone());
        Ok(post)
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, AppError> {
        Ok(lock(&self.posts)
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, post: &Post) -> Result<(), AppError> {
        let mut posts = lock(&self.posts);
        if posts.iter().any(|p| p.slug == post.slug && p.id != post.id) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "post slug {} already exists",
                post.slug
            ))
            .into());
        }
        match posts
            .iter_mut()
            .find(|p| p.id == post.id && p.deleted_at.is_none())
        {
            Some(existing) => {
                *existing = post.clone();
                Ok(())
            }
            None => Err(DatabaseError::NotFound(format!("post {}", post.id)).into()),
        }
    }

    async fn soft_delete(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut posts = lock(&self.posts);
        match posts
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        {
            Some(post) => {
                post.deleted_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_published(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.published_sorted_by(|p| p.published_at, None))
    }

    async fn most_viewed(&self, limit: usize) -> Result<Vec<Post>, AppError> {
        Ok(self.published_sorted_by(|p| p.views, Some(limit)))
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Post>, AppError> {
        Ok(self.published_sorted_by(|p| p.created_at, Some(limit)))
    }
}
