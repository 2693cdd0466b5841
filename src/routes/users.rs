use crate::auth::AuthUser;
use crate::authentication::compute_password_hash;
use crate::errors::AppError;
use crate::InnerState;

use axum::extract::State;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: Option<String>,
    pub email: String,
    pub password_hash: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Safe projection of a user row for the admin back office; never carries
/// the password hash.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct UserSummary {
    pub id: Option<String>,
    pub email: String,
    pub created_at: Option<NaiveDateTime>,
}

#[tracing::instrument(name = "Saving new user in the database", skip(db, password))]
pub async fn create_user(db: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
    let uuid = Uuid::new_v4().to_string();
    let password_hash = compute_password_hash(password)?;

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) RETURNING *"#,
    )
    .bind(&uuid)
    .bind(email)
    .bind(&password_hash)
    .fetch_one(db)
    .await?;

    Ok(user)
}

#[tracing::instrument(name = "Get stored credentials", skip(email, pool))]
pub async fn get_stored_credentials(email: &str, pool: &PgPool) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

#[tracing::instrument(name = "List users", skip(inner, _user))]
pub async fn all_users(
    _user: AuthUser,
    State(inner): State<InnerState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let InnerState { db, .. } = inner;

    let fetch_users_timeout = tokio::time::Duration::from_millis(10000);

    let users = tokio::time::timeout(
        fetch_users_timeout,
        sqlx::query_as::<_, UserSummary>(
            r#"SELECT id, email, created_at FROM users ORDER BY created_at DESC"#,
        )
        .fetch_all(&db),
    )
    .await??;

    Ok(Json(users))
}
