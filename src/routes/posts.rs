/// Post Routes
///
/// Public readers see published posts only. Writes go through the
/// authenticated admin scope, and the author is always the caller.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};
use crate::models::{HotPost, LatestPost, NewPost, Post, PostDetail, PostStatus, PostSummary};
use crate::store::{CategoryStore, PostStore};
use crate::validators::{
    validate_optional_text, validate_required_text, validate_slug, validate_tags,
};

const FRONT_PAGE_LIMIT: usize = 5;
const UNCATEGORIZED: &str = "Uncategorized";
const MAX_TITLE_LENGTH: usize = 200;
const MAX_CONTENT_LENGTH: usize = 200_000;
const MAX_EXCERPT_LENGTH: usize = 500;
const MAX_META_LENGTH: usize = 300;

fn default_status() -> PostStatus {
    PostStatus::Draft
}

#[derive(Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default = "default_status")]
    pub status: PostStatus,
    pub category_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

impl PostRequest {
    async fn validate(
        &self,
        author: Uuid,
        categories: &dyn CategoryStore,
    ) -> Result<NewPost, AppError> {
        if categories.name_by_id(self.category_id).await?.is_none() {
            return Err(ValidationError::InvalidFormat("category_id".to_string()).into());
        }

        Ok(NewPost {
            user_id: author,
            title: validate_required_text("title", &self.title, MAX_TITLE_LENGTH)?,
            slug: validate_slug(&self.slug)?,
            content: validate_optional_text("content", self.content.as_deref(), MAX_CONTENT_LENGTH)?,
            excerpt: validate_optional_text("excerpt", self.excerpt.as_deref(), MAX_EXCERPT_LENGTH)?,
            status: self.status,
            category_id: self.category_id,
            tags: validate_tags(&self.tags)?,
            thumbnail: validate_optional_text("thumbnail", self.thumbnail.as_deref(), MAX_META_LENGTH)?,
            published_at: self.published_at,
            meta_title: validate_optional_text(
                "meta_title",
                self.meta_title.as_deref(),
                MAX_META_LENGTH,
            )?,
            meta_description: validate_optional_text(
                "meta_description",
                self.meta_description.as_deref(),
                MAX_META_LENGTH,
            )?,
        })
    }
}

async fn category_name(categories: &dyn CategoryStore, post: &Post) -> Result<String, AppError> {
    Ok(categories
        .name_by_id(post.category_id)
        .await?
        .unwrap_or_else(|| UNCATEGORIZED.to_string()))
}

/// Load a live post the caller wrote.
///
/// # Errors
/// - 404 when the post does not exist or was deleted
/// - 403 when someone else wrote it
async fn owned_post(posts: &dyn PostStore, id: i64, caller: Uuid) -> Result<Post, AppError> {
    let post = posts
        .find(id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("post {}", id)))?;
    if post.user_id != caller {
        return Err(AuthError::Forbidden.into());
    }
    Ok(post)
}

/// GET /api/posts
pub async fn list_posts(posts: web::Data<dyn PostStore>) -> Result<HttpResponse, AppError> {
    let summaries: Vec<PostSummary> = posts
        .list_published()
        .await?
        .into_iter()
        .map(PostSummary::from)
        .collect();
    Ok(HttpResponse::Ok().json(summaries))
}

/// GET /api/posts/{id}
///
/// Reader view of a published post. Drafts and private posts are 404 here.
pub async fn get_post(
    path: web::Path<i64>,
    posts: web::Data<dyn PostStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let post = posts
        .find(id)
        .await?
        .filter(Post::is_published)
        .ok_or_else(|| DatabaseError::NotFound(format!("post {}", id)))?;

    let category = category_name(categories.get_ref(), &post).await?;
    Ok(HttpResponse::Ok().json(PostDetail::new(post, category)))
}

/// GET /api/posts/hot
pub async fn hot_posts(
    posts: web::Data<dyn PostStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let mut hot = Vec::new();
    for post in posts.most_viewed(FRONT_PAGE_LIMIT).await? {
        let category = category_name(categories.get_ref(), &post).await?;
        hot.push(HotPost::new(post, category));
    }
    Ok(HttpResponse::Ok().json(hot))
}

/// GET /api/posts/latest
pub async fn latest_posts(
    posts: web::Data<dyn PostStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let mut latest = Vec::new();
    for post in posts.latest(FRONT_PAGE_LIMIT).await? {
        let category = category_name(categories.get_ref(), &post).await?;
        latest.push(LatestPost::new(post, category));
    }
    Ok(HttpResponse::Ok().json(latest))
}

/// POST /api/admin/posts
///
/// # Errors
/// - 400: Invalid fields or unknown category
/// - 409: Slug already taken
pub async fn create_post(
    caller: web::ReqData<AuthenticatedUser>,
    form: web::Json<PostRequest>,
    posts: web::Data<dyn PostStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("create_post").with_user_id(caller.user_id);
    let new_post = form
        .validate(caller.user_id, categories.get_ref())
        .await
        .map_err(|e| context.record(e))?;
    let post = posts.create(new_post).await.map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        post_id = post.id,
        status = %post.status,
        "Post created"
    );
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/admin/posts/{id}
///
/// Full record of one of the caller's posts, whatever its status.
pub async fn get_own_post(
    caller: web::ReqData<AuthenticatedUser>,
    path: web::Path<i64>,
    posts: web::Data<dyn PostStore>,
) -> Result<HttpResponse, AppError> {
    let post = owned_post(posts.get_ref(), path.into_inner(), caller.user_id).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// PUT /api/admin/posts/{id}
///
/// # Errors
/// - 400: Invalid fields or unknown category
/// - 403: Caller is not the author
/// - 404: No such post
/// - 409: Slug already taken by another post
pub async fn update_post(
    caller: web::ReqData<AuthenticatedUser>,
    path: web::Path<i64>,
    form: web::Json<PostRequest>,
    posts: web::Data<dyn PostStore>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("update_post").with_user_id(caller.user_id);
    let mut post = owned_post(posts.get_ref(), path.into_inner(), caller.user_id)
        .await
        .map_err(|e| context.record(e))?;
    let changes = form
        .validate(caller.user_id, categories.get_ref())
        .await
        .map_err(|e| context.record(e))?;

    post.apply(changes, Utc::now());
    posts.update(&post).await.map_err(|e| context.record(e))?;

    tracing::info!(request_id = %context.request_id, post_id = post.id, "Post updated");
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/admin/posts/{id}
///
/// Soft delete; the row stays but disappears from every read.
pub async fn delete_post(
    caller: web::ReqData<AuthenticatedUser>,
    path: web::Path<i64>,
    posts: web::Data<dyn PostStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    owned_post(posts.get_ref(), id, caller.user_id).await?;

    if !posts.soft_delete(id, Utc::now()).await? {
        return Err(DatabaseError::NotFound(format!("post {}", id)).into());
    }

    tracing::info!(user_id = %caller.user_id, post_id = id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}
