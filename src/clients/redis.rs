use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use tracing::info;

use crate::{clients::storage::KeyValueStore, models::retry::RetryConfig, utils::retry_with_backoff};

const KEY_PREFIX: &str = "tickbook:";

/// Key-value storage shared across devices of one account. Writes are retried
/// with backoff; reads fail fast so callers fall back to empty data.
pub struct RedisStore {
    connection: MultiplexedConnection,
    retry_config: RetryConfig,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, retry_config: RetryConfig) -> Result<Self, Error> {
        info!("Connecting to Redis");

        let client =
            Client::open(redis_url).map_err(|_| anyhow!("Failed to create redis client"))?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|_| anyhow!("Failed to connect to redis client"))?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            retry_config,
        })
    }

    fn full_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn
            .get(Self::full_key(key))
            .await
            .map_err(|e| anyhow!("Failed to get cached value: {}", e))?;

        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let full_key = Self::full_key(key);

        retry_with_backoff(&self.retry_config, || {
            let key_clone = full_key.clone();
            let value_clone = value.to_string();
            let mut conn = self.connection.clone();

            async move {
                conn.set::<_, _, ()>(&key_clone, value_clone)
                    .await
                    .map_err(|e| e.to_string())
            }
        })
        .await
        .map_err(|e| anyhow!("set_item failed: {}", e))?;

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        let mut conn = self.connection.clone();

        conn.del::<_, ()>(Self::full_key(key))
            .await
            .map_err(|e| anyhow!("Failed to remove cached value: {}", e))?;

        Ok(())
    }
}
