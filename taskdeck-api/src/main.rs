//! # TaskDeck API Server
//!
//! Multi-tenant project and task tracker: organizations register, invite
//! users, and manage projects and kanban tasks, each tenant strictly isolated
//! from the others.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/taskdeck \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p taskdeck-api
//! ```

use std::sync::Arc;
use taskdeck_api::{
    app::{build_router, AppState},
    config::{self, Config},
};
use taskdeck_shared::{
    db::{
        migrations::{get_migration_status, run_migrations},
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber reads RUST_LOG and LOG_FORMAT
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("TaskDeck API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    } else {
        let status = get_migration_status(&pool).await?;
        if !status.is_up_to_date {
            tracing::warn!(
                applied = status.applied_migrations,
                latest = ?status.latest_version,
                "Database schema is behind; set RUN_MIGRATIONS=true or migrate manually"
            );
        }
    }

    let store = PgStore::new(pool.clone());
    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(store), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "taskdeck_api=debug,taskdeck_shared=info,tower_http=debug".into()
    });

    if config::json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
