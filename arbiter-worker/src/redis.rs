use crate::config::Config;

use anyhow::{Context, Result};
use arbiter_protocol::Verdict;
use mobc_redis::mobc;
use mobc_redis::redis;
use mobc_redis::RedisConnectionManager;

pub type Connection = mobc::Connection<RedisConnectionManager>;
pub use redis::aio::ConnectionLike;

/// Pooled access to the shared queue and the result store. Both are touched
/// through single atomic commands (BLPOP, SETEX), so no locking is layered
/// on top.
pub struct RedisModule {
    pool: mobc::Pool<RedisConnectionManager>,
}

impl RedisModule {
    pub fn new(config: &Config) -> Result<Self> {
        let redis_url = config.redis.url.as_str();
        let max_open = config.redis.max_open;
        let client = redis::Client::open(redis_url).context("invalid redis url")?;
        let mgr = RedisConnectionManager::new(client);
        let pool = mobc::Pool::builder().max_open(max_open).build(mgr);
        Ok(Self { pool })
    }

    pub async fn get_connection(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut *conn)
            .await
            .context("redis ping failed")?;
        Ok(())
    }

    /// Blocking pop of the next job payload. Blocks indefinitely: waiting
    /// for work is not a timeout condition.
    pub async fn pop_task(&self, queue_key: &str) -> Result<String> {
        let mut conn = self.get_connection().await?;
        let (_key, payload): (String, String) = redis::cmd("BLPOP")
            .arg(queue_key)
            .arg(0usize)
            .query_async(&mut *conn)
            .await
            .context("failed to pop from the submission queue")?;
        Ok(payload)
    }

    /// Stores one verdict under `<prefix>:<submission_id>` with a fixed
    /// expiry, after which the result is no longer retrievable.
    pub async fn store_verdict(
        &self,
        key_prefix: &str,
        submission_id: &str,
        verdict: &Verdict,
        expiry_secs: u64,
    ) -> Result<()> {
        let key = format!("{}:{}", key_prefix, submission_id);
        let value = serde_json::to_string(verdict)?;

        let mut conn = self.get_connection().await?;
        redis::cmd("SETEX")
            .arg(&key)
            .arg(expiry_secs)
            .arg(value)
            .query_async::<_, ()>(&mut *conn)
            .await
            .with_context(|| format!("failed to store verdict: key = {}", key))?;
        Ok(())
    }
}
