use deadpool_redis::Runtime;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{ENV, api::error};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub fn connect_redis() -> Result<deadpool_redis::Pool, error::SystemError> {
    let mut cfg = deadpool_redis::Config::from_url(&ENV.redis_url);
    cfg.pool = Some(deadpool_redis::PoolConfig { max_size: 16, ..Default::default() });
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
    Ok(pool)
}
