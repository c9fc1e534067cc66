//! Connection pool construction for the Postgres stores.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use llog_core::{Error, Result};

/// Tuning knobs for the Postgres connection pool.
///
/// The defaults suit a single API process in front of one database; use
/// [`PoolConfig::from_env`] to override them per deployment.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long an acquire may wait before failing.
    pub connect_timeout: Duration,
    /// Idle time after which a connection is closed.
    pub idle_timeout: Duration,
    /// Forced recycle age; `None` keeps connections indefinitely.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

impl PoolConfig {
    /// Pool tuning from `DATABASE_MAX_CONNECTIONS` and
    /// `DATABASE_MIN_CONNECTIONS`, with everything else at defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        let read = |name: &str, fallback: u32| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(fallback)
        };
        Self {
            max_connections: read("DATABASE_MAX_CONNECTIONS", base.max_connections),
            min_connections: read("DATABASE_MIN_CONNECTIONS", base.min_connections),
            ..base
        }
    }
}

/// Open a pool with default tuning.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Open a pool with explicit tuning, logging the connect timing.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let started = Instant::now();

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout);
    if let Some(lifetime) = config.max_lifetime {
        options = options.max_lifetime(lifetime);
    }

    let pool = options
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        max_connections = config.max_connections,
        duration_ms = started.elapsed().as_millis() as u64,
        "Connection pool ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_bounded() {
        let config = PoolConfig::default();
        assert!(config.min_connections <= config.max_connections);
        assert!(config.max_lifetime.is_some());
    }

    #[test]
    fn test_from_env_yields_a_usable_config() {
        let config = PoolConfig::from_env();
        assert!(config.max_connections >= 1);
        assert!(config.connect_timeout > Duration::ZERO);
    }
}
