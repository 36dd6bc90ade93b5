/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool construction with health check
/// - `store`: `Store` / `StoreSelector` handles and serializable transactions
/// - `query`: `exactly_one` / `at_most_one` result-shape helpers and the
///   transient-error retry wrapper
/// - `migrations`: embedded schema migrations
///
/// Row types and their queries live in the crate-level `models` module.
///
/// # Example
///
/// ```no_run
/// use depot_shared::db::pool::{create_pool, PoolConfig};
/// use depot_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(&PoolConfig {
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
pub mod query;
pub mod store;
