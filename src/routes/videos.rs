use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::utils::unique_upload_name;
use crate::InnerState;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Video {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub featured: bool,
    pub created_at: Option<NaiveDateTime>,
}

/// A video row joined with its aggregate counters. Counts are always
/// recomputed server-side; nothing in the API trusts a client-held counter.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct VideoWithStats {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub featured: bool,
    pub created_at: Option<NaiveDateTime>,
    pub views_count: i64,
    pub likes_count: i64,
}

/// Typed listing predicate; each set field appends one parameterized clause.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFilter {
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub search: Option<String>,
}

impl VideoFilter {
    pub fn apply(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(category_id) = &self.category_id {
            builder.push(" AND category_id = ");
            builder.push_bind(category_id.clone());
        }
        if let Some(subcategory_id) = &self.subcategory_id {
            builder.push(" AND subcategory_id = ");
            builder.push_bind(subcategory_id.clone());
        }
        if let Some(search) = &self.search {
            builder.push(" AND title ILIKE ");
            builder.push_bind(format!("%{}%", search));
        }
    }
}

#[derive(TryFromMultipart)]
pub struct UploadVideoRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    #[form_data(limit = "512MiB")]
    pub video: FieldData<Bytes>,
    #[form_data(limit = "32MiB")]
    pub thumbnail: Option<FieldData<Bytes>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVideo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub duration: Option<i32>,
    pub year: Option<i32>,
    pub featured: Option<bool>,
}

pub(crate) async fn fetch_videos_with_stats(db: &PgPool) -> Result<Vec<VideoWithStats>, sqlx::Error> {
    sqlx::query_as::<_, VideoWithStats>(
        r#"SELECT v.*,
            COALESCE(l.likes_count, 0) AS likes_count,
            COALESCE(w.views_count, 0) AS views_count
        FROM videos v
        LEFT JOIN (
            SELECT video_id, COUNT(*) AS likes_count FROM video_likes GROUP BY video_id
        ) l ON l.video_id = v.id
        LEFT JOIN (
            SELECT video_id, COUNT(*) AS views_count FROM video_views GROUP BY video_id
        ) w ON w.video_id = v.id
        ORDER BY v.created_at DESC, v.id DESC"#,
    )
    .fetch_all(db)
    .await
}

pub(crate) async fn fetch_video(db: &PgPool, id: &str) -> Result<Video, AppError> {
    sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE id = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))
}

#[tracing::instrument(name = "List videos", skip(inner))]
pub async fn list_videos(
    State(inner): State<InnerState>,
    Query(filter): Query<VideoFilter>,
) -> Result<Json<Vec<Video>>, AppError> {
    let InnerState { db, .. } = inner;

    let fetch_videos_timeout = tokio::time::Duration::from_millis(10000);

    let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE 1=1");
    filter.apply(&mut builder);
    builder.push(" ORDER BY created_at DESC, id DESC");

    let videos = tokio::time::timeout(
        fetch_videos_timeout,
        builder.build_query_as::<Video>().fetch_all(&db),
    )
    .await??;

    Ok(Json(videos))
}

#[tracing::instrument(name = "Upload video", skip(inner, form), fields(uploader = %user.email))]
pub async fn upload_video(
    user: AuthUser,
    State(inner): State<InnerState>,
    TypedMultipart(form): TypedMultipart<UploadVideoRequest>,
) -> Result<(StatusCode, Json<Video>), AppError> {
    let InnerState { db, .. } = inner;

    if form.title.trim().is_empty() {
        return Err(AppError::Validation("Video title is required".to_string()));
    }
    if form.video.contents.is_empty() {
        return Err(AppError::Validation("Video file is required".to_string()));
    }

    let uploads_dir = uploads_dir();
    tokio::fs::create_dir_all(&uploads_dir)
        .await
        .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Failed to create uploads directory")))?;

    let video_name = unique_upload_name(
        form.video
            .metadata
            .file_name
            .as_deref()
            .unwrap_or("video.mp4"),
    );
    let video_path = std::path::Path::new(&uploads_dir).join(&video_name);

    tracing::debug!("Writing video file to {:?}", video_path);
    tokio::fs::write(&video_path, &form.video.contents)
        .await
        .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Failed to store video file")))?;

    // The thumbnail write is a second, sequential round trip.
    let thumbnail_url = match &form.thumbnail {
        Some(thumbnail) => {
            let thumbnail_name = unique_upload_name(
                thumbnail
                    .metadata
                    .file_name
                    .as_deref()
                    .unwrap_or("thumbnail.jpg"),
            );
            let thumbnail_path = std::path::Path::new(&uploads_dir).join(&thumbnail_name);
            tokio::fs::write(&thumbnail_path, &thumbnail.contents)
                .await
                .map_err(|e| {
                    AppError::Unexpected(
                        anyhow::Error::new(e).context("Failed to store thumbnail file"),
                    )
                })?;
            Some(format!("/uploads/{}", thumbnail_name))
        }
        None => None,
    };

    let uuid = Uuid::new_v4().to_string();
    let video_url = format!("/uploads/{}", video_name);

    let video = sqlx::query_as::<_, Video>(
        r#"INSERT INTO videos
            (id, title, description, video_url, thumbnail_url, duration, year, category_id, subcategory_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *"#,
    )
    .bind(&uuid)
    .bind(form.title.trim())
    .bind(&form.description)
    .bind(&video_url)
    .bind(&thumbnail_url)
    .bind(form.duration)
    .bind(form.year)
    .bind(&form.category_id)
    .bind(&form.subcategory_id)
    .fetch_one(&db)
    .await?;

    tracing::info!("Stored video {} at {}", video.title, video.video_url);

    Ok((StatusCode::CREATED, Json(video)))
}

#[tracing::instrument(name = "Update video", skip(inner, _user), fields(video_id = %id))]
pub async fn update_video(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateVideo>,
) -> Result<Json<Video>, AppError> {
    let InnerState { db, .. } = inner;

    let video = sqlx::query_as::<_, Video>(
        r#"UPDATE videos
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            category_id = COALESCE($3, category_id),
            subcategory_id = COALESCE($4, subcategory_id),
            duration = COALESCE($5, duration),
            year = COALESCE($6, year),
            featured = COALESCE($7, featured)
        WHERE id = $8
        RETURNING *"#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.category_id)
    .bind(&payload.subcategory_id)
    .bind(payload.duration)
    .bind(payload.year)
    .bind(payload.featured)
    .bind(&id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Video {} not found", id)))?;

    Ok(Json(video))
}

#[tracing::instrument(name = "Delete video", skip(inner, _user), fields(video_id = %id))]
pub async fn delete_video(
    _user: AuthUser,
    State(inner): State<InnerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    let result = sqlx::query(r#"DELETE FROM videos WHERE id = $1"#)
        .bind(&id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Video {} not found", id)));
    }

    Ok(Json(json!({ "data": "video deleted" })))
}

pub(crate) fn uploads_dir() -> String {
    std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_adds_no_clauses() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE 1=1");
        VideoFilter::default().apply(&mut builder);
        assert_eq!(builder.into_sql(), "SELECT * FROM videos WHERE 1=1");
    }

    #[test]
    fn category_filter_binds_one_parameter() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE 1=1");
        let filter = VideoFilter {
            category_id: Some("c1".to_string()),
            ..Default::default()
        };
        filter.apply(&mut builder);
        assert_eq!(
            builder.into_sql(),
            "SELECT * FROM videos WHERE 1=1 AND category_id = $1"
        );
    }

    #[test]
    fn all_filters_compose_in_order() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE 1=1");
        let filter = VideoFilter {
            category_id: Some("c1".to_string()),
            subcategory_id: Some("s1".to_string()),
            search: Some("runway".to_string()),
        };
        filter.apply(&mut builder);
        assert_eq!(
            builder.into_sql(),
            "SELECT * FROM videos WHERE 1=1 AND category_id = $1 AND subcategory_id = $2 AND title ILIKE $3"
        );
    }
}
