/// Database layer for Clubhouse
///
/// Connection pooling and schema migrations. Entity queries live next to
/// their types in the `models` module.
///
/// # Example
///
/// ```no_run
/// use clubhouse_shared::db::pool::{create_pool, DatabaseConfig};
/// use clubhouse_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
