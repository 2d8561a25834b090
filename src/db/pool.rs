use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Builds the bounded Postgres pool from configuration.
///
/// Connections are established lazily: absent credentials fail at startup
/// via config validation, but an unreachable database surfaces per-request.
/// Waiting for a connection is bounded by the acquire timeout, after which
/// the request fails rather than blocking indefinitely.
pub fn build_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = match &config.url {
        Some(url) => PgConnectOptions::from_str(url)?,
        None => PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.dbname)
            .username(&config.user)
            .password(&config.password),
    };

    Ok(PgPoolOptions::new()
        .min_connections(1)
        .max_connections(config.pool_size)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_lazy_with(options))
}
