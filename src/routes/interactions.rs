use crate::auth::{AuthUser, MaybeAuthUser};
use crate::errors::AppError;
use crate::routes::fetch_video;
use crate::InnerState;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct VideoStats {
    pub views_count: i64,
    pub likes_count: i64,
    pub user_has_liked: bool,
}

async fn count_rows(db: &PgPool, sql: &str, video_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(video_id)
        .fetch_one(db)
        .await
}

#[tracing::instrument(name = "Video stats", skip(inner, viewer), fields(video_id = %video_id))]
pub async fn video_stats(
    viewer: MaybeAuthUser,
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoStats>, AppError> {
    let InnerState { db, .. } = inner;

    fetch_video(&db, &video_id).await?;

    let fetch_stats_timeout = tokio::time::Duration::from_millis(10000);

    let (likes_count, views_count) = tokio::try_join!(
        tokio::time::timeout(
            fetch_stats_timeout,
            count_rows(&db, "SELECT COUNT(*) FROM video_likes WHERE video_id = $1", &video_id),
        ),
        tokio::time::timeout(
            fetch_stats_timeout,
            count_rows(&db, "SELECT COUNT(*) FROM video_views WHERE video_id = $1", &video_id),
        ),
    )?;
    let (likes_count, views_count) = (likes_count?, views_count?);

    let user_has_liked = match &viewer.0 {
        Some(user) => sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM video_likes WHERE video_id = $1 AND user_id = $2)"#,
        )
        .bind(&video_id)
        .bind(&user.user_id)
        .fetch_one(&db)
        .await?,
        None => false,
    };

    Ok(Json(VideoStats {
        views_count,
        likes_count,
        user_has_liked,
    }))
}

/// Records a view unconditionally. Reopening the same video counts again;
/// anonymous viewers are recorded with a null user id.
#[tracing::instrument(name = "Record view", skip(inner, viewer), fields(video_id = %video_id))]
pub async fn record_view(
    viewer: MaybeAuthUser,
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    fetch_video(&db, &video_id).await?;

    let uuid = Uuid::new_v4().to_string();
    let user_id = viewer.0.as_ref().map(|u| u.user_id.clone());

    sqlx::query(r#"INSERT INTO video_views (id, video_id, user_id) VALUES ($1, $2, $3)"#)
        .bind(&uuid)
        .bind(&video_id)
        .bind(&user_id)
        .execute(&db)
        .await?;

    // Respond with the exact aggregate, never an optimistic increment.
    let views_count = count_rows(
        &db,
        "SELECT COUNT(*) FROM video_views WHERE video_id = $1",
        &video_id,
    )
    .await?;

    Ok(Json(json!({ "views_count": views_count })))
}

/// Direction of a like toggle, decided from whether the caller already has
/// a like row. Two toggles in a row always land back on the starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LikeToggle {
    Like,
    Unlike,
}

impl LikeToggle {
    pub(crate) fn from_existing(already_liked: bool) -> Self {
        if already_liked {
            LikeToggle::Unlike
        } else {
            LikeToggle::Like
        }
    }

    pub(crate) fn liked(self) -> bool {
        matches!(self, LikeToggle::Like)
    }
}

/// Flips the caller's like for a video. The check-then-act pair and the
/// count read run inside one transaction, so concurrent toggles from two
/// tabs cannot leave the counter out of step with the rows.
#[tracing::instrument(name = "Toggle like", skip(inner, user), fields(video_id = %video_id, user_id = %user.user_id))]
pub async fn toggle_like(
    user: AuthUser,
    State(inner): State<InnerState>,
    Path(video_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    fetch_video(&db, &video_id).await?;

    let mut transaction = db.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        r#"SELECT id FROM video_likes WHERE video_id = $1 AND user_id = $2 FOR UPDATE"#,
    )
    .bind(&video_id)
    .bind(&user.user_id)
    .fetch_optional(&mut *transaction)
    .await?;

    let toggle = LikeToggle::from_existing(existing.is_some());

    match toggle {
        LikeToggle::Unlike => {
            sqlx::query(r#"DELETE FROM video_likes WHERE video_id = $1 AND user_id = $2"#)
                .bind(&video_id)
                .bind(&user.user_id)
                .execute(&mut *transaction)
                .await?;
        }
        LikeToggle::Like => {
            let uuid = Uuid::new_v4().to_string();
            sqlx::query(
                r#"INSERT INTO video_likes (id, video_id, user_id) VALUES ($1, $2, $3)"#,
            )
            .bind(&uuid)
            .bind(&video_id)
            .bind(&user.user_id)
            .execute(&mut *transaction)
            .await?;
        }
    }

    let likes_count: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM video_likes WHERE video_id = $1"#)
            .bind(&video_id)
            .fetch_one(&mut *transaction)
            .await?;

    transaction.commit().await?;

    Ok(Json(json!({ "liked": toggle.liked(), "likes_count": likes_count })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn toggle_once(rows: &mut HashSet<(String, String)>, video_id: &str, user_id: &str) -> LikeToggle {
        let key = (video_id.to_string(), user_id.to_string());
        let toggle = LikeToggle::from_existing(rows.contains(&key));
        match toggle {
            LikeToggle::Like => rows.insert(key),
            LikeToggle::Unlike => rows.remove(&key),
        };
        toggle
    }

    #[test]
    fn toggle_direction_follows_existing_row() {
        assert_eq!(LikeToggle::from_existing(false), LikeToggle::Like);
        assert_eq!(LikeToggle::from_existing(true), LikeToggle::Unlike);
        assert!(LikeToggle::Like.liked());
        assert!(!LikeToggle::Unlike.liked());
    }

    #[test]
    fn toggling_twice_restores_state_and_count() {
        let mut rows = HashSet::new();
        rows.insert(("vid-1".to_string(), "someone-else".to_string()));
        let count_before = rows.len();

        let first = toggle_once(&mut rows, "vid-1", "user-1");
        assert!(first.liked());
        assert_eq!(rows.len(), count_before + 1);

        let second = toggle_once(&mut rows, "vid-1", "user-1");
        assert!(!second.liked());
        assert_eq!(rows.len(), count_before);
    }

    #[test]
    fn toggles_for_different_videos_are_independent() {
        let mut rows = HashSet::new();

        assert!(toggle_once(&mut rows, "vid-1", "user-1").liked());
        assert!(toggle_once(&mut rows, "vid-2", "user-1").liked());
        assert!(!toggle_once(&mut rows, "vid-1", "user-1").liked());
        assert_eq!(rows.len(), 1);
    }
}
