/// Database layer for TaskDeck
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations from the workspace `migrations/` directory
///
/// Row-level queries live on the models in [`crate::models`]; the transactional
/// operations built on them live in [`crate::store::postgres`].
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
