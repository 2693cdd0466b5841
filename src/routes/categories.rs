use crate::auth::AuthUser;
use crate::catalog::{compose, CatalogView};
use crate::errors::AppError;
use crate::routes::fetch_videos_with_stats;
use crate::utils::slugify;
use crate::InnerState;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Category {
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Subcategory {
    pub id: Option<String>,
    pub category_id: String,
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubcategory {
    pub category_id: String,
    pub name: String,
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubcategory {
    pub name: Option<String>,
    pub order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

pub(crate) async fn fetch_categories(db: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(r#"SELECT * FROM categories ORDER BY "order", id"#)
        .fetch_all(db)
        .await
}

pub(crate) async fn fetch_subcategories(db: &PgPool) -> Result<Vec<Subcategory>, sqlx::Error> {
    sqlx::query_as::<_, Subcategory>(r#"SELECT * FROM subcategories ORDER BY "order", id"#)
        .fetch_all(db)
        .await
}

#[tracing::instrument(name = "List categories", skip(inner))]
pub async fn all_categories(State(inner): State<InnerState>) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    let fetch_categories_timeout = tokio::time::Duration::from_millis(10000);

    let (categories, subcategories) = tokio::try_join!(
        tokio::time::timeout(fetch_categories_timeout, fetch_categories(&db)),
        tokio::time::timeout(fetch_categories_timeout, fetch_subcategories(&db)),
    )?;
    let (categories, subcategories) = (categories?, subcategories?);

    Ok(Json(json!({
        "categories": categories,
        "subcategories": subcategories
    })))
}

#[tracing::instrument(name = "Browse catalog", skip(inner), fields(category = ?params.category))]
pub async fn browse_catalog(
    State(inner): State<InnerState>,
    Query(params): Query<CatalogQuery>,
) -> Result<Json<CatalogView>, AppError> {
    let InnerState { db, .. } = inner;

    let fetch_catalog_timeout = tokio::time::Duration::from_millis(10000);

    let (categories, subcategories, videos) = tokio::try_join!(
        tokio::time::timeout(fetch_catalog_timeout, fetch_categories(&db)),
        tokio::time::timeout(fetch_catalog_timeout, fetch_subcategories(&db)),
        tokio::time::timeout(fetch_catalog_timeout, fetch_videos_with_stats(&db)),
    )?;
    let (categories, subcategories, videos) = (categories?, subcategories?, videos?);

    let view = compose(
        &categories,
        &subcategories,
        &videos,
        params.category.as_deref(),
    );

    Ok(Json(view))
}

#[tracing::instrument(name = "Create category", skip(inner, _user))]
pub async fn create_category(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Json(payload): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let InnerState { db, .. } = inner;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }

    let uuid = Uuid::new_v4().to_string();
    let slug = slugify(&payload.name);

    let category = sqlx::query_as::<_, Category>(
        r#"INSERT INTO categories (id, name, slug, "order") VALUES ($1, $2, $3, $4) RETURNING *"#,
    )
    .bind(&uuid)
    .bind(payload.name.trim())
    .bind(&slug)
    .bind(payload.order.unwrap_or(0))
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

#[tracing::instrument(name = "Update category", skip(inner, _user), fields(category_id = %id))]
pub async fn update_category(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCategory>,
) -> Result<Json<Category>, AppError> {
    let InnerState { db, .. } = inner;

    let slug = payload.name.as_deref().map(slugify);

    let category = sqlx::query_as::<_, Category>(
        r#"UPDATE categories
        SET name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            "order" = COALESCE($3, "order")
        WHERE id = $4
        RETURNING *"#,
    )
    .bind(&payload.name)
    .bind(&slug)
    .bind(payload.order)
    .bind(&id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

    Ok(Json(category))
}

#[tracing::instrument(name = "Delete category", skip(inner, _user), fields(category_id = %id))]
pub async fn delete_category(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    // Subcategories and their videos go with it, enforced by the schema.
    let result = sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
        .bind(&id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Category {} not found", id)));
    }

    Ok(Json(json!({ "data": "category deleted" })))
}

#[tracing::instrument(name = "Create subcategory", skip(inner, _user))]
pub async fn create_subcategory(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Json(payload): Json<CreateSubcategory>,
) -> Result<(StatusCode, Json<Subcategory>), AppError> {
    let InnerState { db, .. } = inner;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Subcategory name is required".to_string(),
        ));
    }

    let uuid = Uuid::new_v4().to_string();
    let slug = slugify(&payload.name);

    let subcategory = sqlx::query_as::<_, Subcategory>(
        r#"INSERT INTO subcategories (id, category_id, name, slug, "order")
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(&uuid)
    .bind(&payload.category_id)
    .bind(payload.name.trim())
    .bind(&slug)
    .bind(payload.order.unwrap_or(0))
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(subcategory)))
}

#[tracing::instrument(name = "Update subcategory", skip(inner, _user), fields(subcategory_id = %id))]
pub async fn update_subcategory(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSubcategory>,
) -> Result<Json<Subcategory>, AppError> {
    let InnerState { db, .. } = inner;

    let slug = payload.name.as_deref().map(slugify);

    let subcategory = sqlx::query_as::<_, Subcategory>(
        r#"UPDATE subcategories
        SET name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            "order" = COALESCE($3, "order")
        WHERE id = $4
        RETURNING *"#,
    )
    .bind(&payload.name)
    .bind(&slug)
    .bind(payload.order)
    .bind(&id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Subcategory {} not found", id)))?;

    Ok(Json(subcategory))
}

#[tracing::instrument(name = "Delete subcategory", skip(inner, _user), fields(subcategory_id = %id))]
pub async fn delete_subcategory(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    let result = sqlx::query(r#"DELETE FROM subcategories WHERE id = $1"#)
        .bind(&id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Subcategory {} not found", id)));
    }

    Ok(Json(json!({ "data": "subcategory deleted" })))
}
