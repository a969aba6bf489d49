use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tickbook_client::{
    clients::{
        popup::PopupNotifier,
        storage::{KeyValueStore, MemoryStore},
    },
    models::notification::Notification,
    services::notifications::NotificationService,
};

/// Storage whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get_item(&self, _key: &str) -> Result<Option<String>, Error> {
        Err(anyhow!("storage offline"))
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<(), Error> {
        Err(anyhow!("storage offline"))
    }

    async fn remove_item(&self, _key: &str) -> Result<(), Error> {
        Err(anyhow!("storage offline"))
    }
}

/// Memory storage whose writes can be switched off.
#[derive(Default)]
pub struct ReadOnlySwitchStore {
    inner: MemoryStore,
    pub reject_writes: AtomicBool,
}

#[async_trait]
impl KeyValueStore for ReadOnlySwitchStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.inner.remove_item(key).await
    }
}

#[derive(Default)]
pub struct RecordingPopup {
    pub shown: Mutex<Vec<String>>,
}

#[async_trait]
impl PopupNotifier for RecordingPopup {
    async fn display(&self, notification: &Notification) -> Result<(), Error> {
        self.shown.lock().unwrap().push(notification.id.clone());
        Ok(())
    }
}

pub struct FailingPopup;

#[async_trait]
impl PopupNotifier for FailingPopup {
    async fn display(&self, _notification: &Notification) -> Result<(), Error> {
        Err(anyhow!("notification module unavailable"))
    }
}

pub fn memory_service() -> (Arc<MemoryStore>, NotificationService) {
    let store = Arc::new(MemoryStore::new());
    let service = NotificationService::new(store.clone(), None);
    (store, service)
}
