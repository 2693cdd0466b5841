mod access;
mod auth;
mod authentication;
mod catalog;
mod db;
mod errors;
mod routes;
mod utils;

use crate::db::init_db;

use crate::routes::{
    all_categories, all_plans, all_users, browse_catalog, create_category, create_plan,
    create_subcategory, create_subscription, delete_category, delete_subcategory, delete_video,
    health_check, list_videos, login_user, record_view, register_user, subscription_status,
    toggle_like, update_category, update_plan, update_subcategory, update_video, upload_video,
    uploads_dir, video_stats,
};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use axum_prometheus::PrometheusMetricLayer;
use sqlx::PgPool;
use std::error::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Clone)]
pub struct InnerState {
    pub db: PgPool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modaflix_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = init_db().await?;

    let uploads_dir = uploads_dir();
    tokio::fs::create_dir_all(&uploads_dir).await?;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app_state = InnerState { db };

    let app = Router::new()
        .route("/api/health", get(health_check))

        .route("/api/auth/register", post(register_user))
        .route("/api/auth/login", post(login_user))

        .route("/api/categories", get(all_categories).post(create_category))
        .route(
            "/api/categories/:id",
            patch(update_category).delete(delete_category),
        )
        .route("/api/subcategories", post(create_subcategory))
        .route(
            "/api/subcategories/:id",
            patch(update_subcategory).delete(delete_subcategory),
        )
        .route("/api/catalog", get(browse_catalog))

        .route("/api/videos", get(list_videos).post(upload_video))
        .route("/api/videos/:id", patch(update_video).delete(delete_video))
        .route("/api/videos/:id/stats", get(video_stats))
        .route("/api/videos/:id/views", post(record_view))
        .route("/api/videos/:id/likes/toggle", post(toggle_like))

        .route("/api/plans", get(all_plans).post(create_plan))
        .route("/api/plans/:id", patch(update_plan))
        .route("/api/subscriptions", post(create_subscription))
        .route("/api/subscriptions/status", get(subscription_status))

        .route("/api/users", get(all_users))

        .route("/metrics", get(|| async move { metric_handle.render() }))
        .nest_service("/uploads", ServeDir::new(&uploads_dir))

        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(prometheus_layer)
        .with_state(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "4000".to_string());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Could not initialize TcpListener");

    tracing::debug!(
        "listening on {}",
        listener
            .local_addr()
            .expect("Could not convert listener address to local address")
    );

    axum::serve(listener, app)
        .await
        .expect("Could not successfully connect");

    Ok(())
}
