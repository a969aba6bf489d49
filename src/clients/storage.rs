use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::{debug, info};

use crate::{
    clients::redis::RedisStore,
    config::{Config, StorageBackend},
};

/// String-keyed async storage, the shape of a mobile async-storage module.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when the key has never been set or was removed.
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing an absent key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), Error>;
}

pub async fn build_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, Error> {
    let store: Arc<dyn KeyValueStore> = match config.storage_backend()? {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(FileStore::open(&config.storage_path).await?),
        StorageBackend::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow!("REDIS_URL is not configured"))?;
            Arc::new(RedisStore::connect(redis_url, config.retry_config()).await?)
        }
    };

    info!(backend = %config.storage_backend, "Key-value store ready");

    Ok(store)
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// One file per key under a directory. Writes go to a temporary file that is
/// renamed over the target, so readers never see a half-written value.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| anyhow!("Failed to create storage directory {}: {}", root.display(), e))?;

        debug!(path = %root.display(), "File store opened");

        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

/// Keeps ASCII letters, digits and `-`; every other byte becomes `_xx` in
/// lowercase hex. `_` itself is escaped, so distinct keys never share a file.
fn encode_key(key: &str) -> String {
    let mut file_name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            file_name.push(char::from(byte));
        } else {
            file_name.push_str(&format!("_{:02x}", byte));
        }
    }
    file_name
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read key '{}': {}", key, e)),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)
            .await
            .map_err(|e| anyhow!("Failed to write key '{}': {}", key, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| anyhow!("Failed to commit key '{}': {}", key, e))?;

        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to remove key '{}': {}", key, e)),
        }
    }
}
