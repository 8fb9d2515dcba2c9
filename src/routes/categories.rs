use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{CategorySummary, NewCategory};
use crate::store::CategoryStore;
use crate::validators::{validate_optional_text, validate_required_text, validate_slug};

const MAX_CATEGORY_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 1000;

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CategoryRequest {
    fn validate(&self) -> Result<NewCategory, AppError> {
        Ok(NewCategory {
            name: validate_required_text("name", &self.name, MAX_CATEGORY_NAME_LENGTH)?,
            slug: validate_slug(&self.slug)?,
            description: validate_optional_text(
                "description",
                self.description.as_deref(),
                MAX_DESCRIPTION_LENGTH,
            )?,
        })
    }
}

/// GET /api/categories
pub async fn list_categories(
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let summaries: Vec<CategorySummary> = categories
        .list()
        .await?
        .into_iter()
        .map(CategorySummary::from)
        .collect();
    Ok(HttpResponse::Ok().json(summaries))
}

/// POST /api/admin/categories
///
/// # Errors
/// - 400: Empty name or malformed slug
/// - 409: Slug already taken
pub async fn create_category(
    form: web::Json<CategoryRequest>,
    categories: web::Data<dyn CategoryStore>,
) -> Result<HttpResponse, AppError> {
    let category = categories.create(form.validate()?).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
    Ok(HttpResponse::Created().json(category))
}
