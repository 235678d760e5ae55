use anyhow::Result;
use atelier_orderservice::{
    build_app,
    platform::{app_state::AppState, bootstrap, config, db},
};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let db_pool = db::create_pool(&config.database.url).await?;
    let port = config.server.port;
    let app = build_app(AppState::new(db_pool, config));

    tracing::info!("Bootstrapping...");
    bootstrap::serve("OrderService", app, port).await
}
