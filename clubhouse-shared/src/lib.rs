//! # Clubhouse Shared Library
//!
//! Domain types, persistence and authentication building blocks used by the
//! Clubhouse API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models, computed properties and state transitions
//! - `auth`: Password hashing, JWT tokens, the role policy table and token revocation
//! - `db`: Connection pool and migrations
//! - `redis`: Redis client used by the Redis-backed revocation store
//! - `pagination`: Page requests and pagination metadata for list endpoints
//! - `error`: Domain-level errors raised by entity operations

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod redis;

/// Current version of the Clubhouse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
