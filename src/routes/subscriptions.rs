use crate::access::{self, AccessGate, Prompt};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::routes::SubscriptionPlan;
use crate::InnerState;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct UserSubscription {
    pub id: Option<String>,
    pub user_id: String,
    pub plan_id: String,
    pub status: String,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscription {
    pub plan_id: String,
}

/// Full gate evaluation for the signed-in user, recomputed from the store
/// on every call and after every mutation; there is no push channel.
#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub has_active_subscription: bool,
    pub has_ads: bool,
    pub gate: AccessGate,
    pub prompt: Option<Prompt>,
    pub plan: Option<SubscriptionPlan>,
    pub subscription: Option<UserSubscription>,
}

#[tracing::instrument(name = "Load subscription status", skip(db), fields(user_id = %user_id))]
pub(crate) async fn load_status(db: &PgPool, user_id: &str) -> Result<SubscriptionStatus, AppError> {
    let fetch_subscription_timeout = tokio::time::Duration::from_millis(10000);

    let subscriptions = tokio::time::timeout(
        fetch_subscription_timeout,
        sqlx::query_as::<_, UserSubscription>(
            r#"SELECT * FROM user_subscriptions WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(db),
    )
    .await??;

    let subscription = access::pick_current(&subscriptions).cloned();

    let plan = match &subscription {
        Some(subscription) => {
            sqlx::query_as::<_, SubscriptionPlan>(
                r#"SELECT * FROM subscription_plans WHERE id = $1"#,
            )
            .bind(&subscription.plan_id)
            .fetch_optional(db)
            .await?
        }
        None => None,
    };

    let gate = access::evaluate(true, plan.as_ref());

    Ok(SubscriptionStatus {
        has_active_subscription: subscription.is_some(),
        // Viewers without a plan count as ad-supported.
        has_ads: plan.as_ref().map(|p| p.has_ads).unwrap_or(true),
        prompt: gate.prompt(),
        gate,
        plan,
        subscription,
    })
}

#[tracing::instrument(name = "Subscription status", skip(inner, user), fields(user_id = %user.user_id))]
pub async fn subscription_status(
    user: AuthUser,
    State(inner): State<InnerState>,
) -> Result<Json<SubscriptionStatus>, AppError> {
    let InnerState { db, .. } = inner;

    let status = load_status(&db, &user.user_id).await?;

    Ok(Json(status))
}

#[tracing::instrument(name = "Create subscription", skip(inner, user), fields(user_id = %user.user_id, plan_id = %payload.plan_id))]
pub async fn create_subscription(
    user: AuthUser,
    State(inner): State<InnerState>,
    Json(payload): Json<CreateSubscription>,
) -> Result<(StatusCode, Json<SubscriptionStatus>), AppError> {
    let InnerState { db, .. } = inner;

    let plan = sqlx::query_as::<_, SubscriptionPlan>(
        r#"SELECT * FROM subscription_plans WHERE id = $1"#,
    )
    .bind(&payload.plan_id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", payload.plan_id)))?;

    if !plan.active {
        return Err(AppError::Validation(format!(
            "Plan {} is no longer offered",
            plan.slug
        )));
    }

    let uuid = Uuid::new_v4().to_string();

    sqlx::query(
        r#"INSERT INTO user_subscriptions (id, user_id, plan_id, status, current_period_start)
        VALUES ($1, $2, $3, 'active', CURRENT_TIMESTAMP)"#,
    )
    .bind(&uuid)
    .bind(&user.user_id)
    .bind(&payload.plan_id)
    .execute(&db)
    .await?;

    tracing::info!("User subscribed to plan {}", plan.slug);

    // Re-read the whole status after the mutation; the caller renders from
    // this response alone.
    let status = load_status(&db, &user.user_id).await?;

    Ok((StatusCode::CREATED, Json(status)))
}
