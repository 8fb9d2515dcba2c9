use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use uuid::Uuid;

use super::lock;
use crate::error::{AppError, DatabaseError};
use crate::models::{Category, NewCategory};

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, category: NewCategory) -> Result<Category, AppError>;
    /// All categories ordered by name
    async fn list(&self) -> Result<Vec<Category>, AppError>;
    async fn name_by_id(&self, id: Uuid) -> Result<Option<String>, AppError>;
}

pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category, AppError> {
        let category = category.into_category();
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn name_by_id(&self, id: Uuid) -> Result<Option<String>, AppError> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryStore {
    categories: Mutex<Vec<Category>>,
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn create(&self, category: NewCategory) -> Result<Category, AppError> {
        let mut categories = lock(&self.categories);
        if categories.iter().any(|c| c.slug == category.slug) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "category slug {} already exists",
                category.slug
            ))
            .into());
        }
        let category = category.into_category();
        categories.push(category.clone());
        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = lock(&self.categories).clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn name_by_id(&self, id: Uuid) -> Result<Option<String>, AppError> {
        Ok(lock(&self.categories)
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone()))
    }
}
