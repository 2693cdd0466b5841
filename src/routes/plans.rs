use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::utils::slugify;
use crate::InnerState;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SubscriptionPlan {
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// Monthly price in cents.
    pub price_monthly: i32,
    pub has_ads: bool,
    pub features: Vec<String>,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlan {
    pub name: String,
    pub description: Option<String>,
    pub price_monthly: i32,
    pub has_ads: bool,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_monthly: Option<i32>,
    pub has_ads: Option<bool>,
    pub features: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[tracing::instrument(name = "List plans", skip(inner))]
pub async fn all_plans(State(inner): State<InnerState>) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    let InnerState { db, .. } = inner;

    let fetch_plans_timeout = tokio::time::Duration::from_millis(10000);

    let plans = tokio::time::timeout(
        fetch_plans_timeout,
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"SELECT * FROM subscription_plans WHERE active = true ORDER BY price_monthly, id"#,
        )
        .fetch_all(&db),
    )
    .await??;

    Ok(Json(plans))
}

#[tracing::instrument(name = "Create plan", skip(inner, _user))]
pub async fn create_plan(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Json(payload): Json<CreatePlan>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), AppError> {
    let InnerState { db, .. } = inner;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Plan name is required".to_string()));
    }
    if payload.price_monthly < 0 {
        return Err(AppError::Validation(
            "Plan price cannot be negative".to_string(),
        ));
    }

    let uuid = Uuid::new_v4().to_string();
    let slug = slugify(&payload.name);

    let plan = sqlx::query_as::<_, SubscriptionPlan>(
        r#"INSERT INTO subscription_plans (id, name, slug, description, price_monthly, has_ads, features)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *"#,
    )
    .bind(&uuid)
    .bind(payload.name.trim())
    .bind(&slug)
    .bind(&payload.description)
    .bind(payload.price_monthly)
    .bind(payload.has_ads)
    .bind(payload.features.unwrap_or_default())
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

#[tracing::instrument(name = "Update plan", skip(inner, _user), fields(plan_id = %id))]
pub async fn update_plan(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePlan>,
) -> Result<Json<SubscriptionPlan>, AppError> {
    let InnerState { db, .. } = inner;

    let slug = payload.name.as_deref().map(slugify);

    let plan = sqlx::query_as::<_, SubscriptionPlan>(
        r#"UPDATE subscription_plans
        SET name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            description = COALESCE($3, description),
            price_monthly = COALESCE($4, price_monthly),
            has_ads = COALESCE($5, has_ads),
            features = COALESCE($6, features),
            active = COALESCE($7, active)
        WHERE id = $8
        RETURNING *"#,
    )
    .bind(&payload.name)
    .bind(&slug)
    .bind(&payload.description)
    .bind(payload.price_monthly)
    .bind(payload.has_ads)
    .bind(&payload.features)
    .bind(payload.active)
    .bind(&id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", id)))?;

    Ok(Json(plan))
}
