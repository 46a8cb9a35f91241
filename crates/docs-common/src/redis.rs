/// Optional Redis cache in front of the documentation index.
///
/// Every public operation swallows failures: a miss, a dead connection and a
/// missing `REDIS_URL` all look the same to callers (`None` / `false`), and the
/// failure is logged at `warn`. The server works identically without Redis.
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::CommonError;

const SCAN_BATCH: usize = 100;

pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Builds a cache handle. An absent or unparsable URL yields a handle whose
    /// operations are all no-ops.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "invalid redis url, cache disabled"))
                .ok()
        });
        Self { client }
    }

    /// A handle that never talks to Redis.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisUnavailable)?;
        Ok(client.get_multiplexed_async_connection().await?)
    }

    async fn connect_or_warn(&self) -> Option<MultiplexedConnection> {
        match self.connection().await {
            Ok(conn) => Some(conn),
            Err(CommonError::RedisUnavailable) => None,
            Err(e) => {
                warn!(error = %e, "redis connection failed");
                None
            }
        }
    }

    /// Sends a PING. `true` only when Redis answered.
    pub async fn is_available(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connect_or_warn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    pub async fn set(&self, key: &str, value: &str) -> bool {
        let Some(mut conn) = self.connect_or_warn().await else {
            return false;
        };
        conn.set::<_, _, ()>(key, value)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SET failed"))
            .is_ok()
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connect_or_warn().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Reads a JSON value. Undecodable entries count as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.get(key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    /// Stores a JSON value, with an expiry when `ttl_secs` is given.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, key, "cache serialization failed");
                return false;
            }
        };
        match ttl_secs {
            Some(ttl) => self.set_with_ttl(key, &json, ttl).await,
            None => self.set(key, &json).await,
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.connect_or_warn().await else {
            return false;
        };
        conn.del::<_, ()>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis DEL failed"))
            .is_ok()
    }

    /// Removes every key starting with `prefix`. Walks the keyspace with SCAN
    /// so a large cache never blocks the server the way KEYS would.
    pub async fn delete_by_prefix(&self, prefix: &str) -> bool {
        let Some(mut conn) = self.connect_or_warn().await else {
            return false;
        };

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next_cursor, keys) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, pattern, "redis DEL failed during prefix delete");
                    return false;
                }
            }

            if next_cursor == 0 {
                return true;
            }
            cursor = next_cursor;
        }
    }
}
