/// Redis integration
///
/// Redis is optional. When `REDIS_URL` is configured the API keeps revoked
/// token ids there (`revoked:{jti}` keys with a TTL matching the token's
/// remaining lifetime) so every server instance sees the same logout state.
///
/// # Example
///
/// ```no_run
/// use clubhouse_shared::redis::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig, RedisStats};
