use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[tracing::instrument(name = "Initialize database pool")]
pub async fn init_db() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set.");

    tracing::info!("Connecting to Postgres");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    tracing::info!("Running pending migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
