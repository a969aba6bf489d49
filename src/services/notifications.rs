//! The local notification store.
//!
//! Notifications live as one JSON array under [`NOTIFICATIONS_STORAGE_KEY`],
//! newest first, capped at [`MAX_STORED_NOTIFICATIONS`]. Every mutation is a
//! load, modify, write-back cycle over the whole list. Those cycles are
//! serialised by a writer lock owned by the service, so two writers in the
//! same process cannot drop each other's changes. Separate processes sharing
//! one backing store still race, last writer wins.
//!
//! Writes operate on the stored JSON records rather than the typed view, so
//! records this version cannot decode, unknown types and extra keys written
//! by other app versions survive every mutation untouched.
//!
//! Storage failures never reach callers: reads degrade to an empty list and
//! writes are logged and dropped.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use anyhow::{Error, Result};
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, warn};

use crate::{
    clients::{popup::PopupNotifier, storage::KeyValueStore},
    models::notification::{Notification, NotificationFeed, NotificationType, TicketPurchase},
};

pub const NOTIFICATIONS_STORAGE_KEY: &str = "@notifications";
pub const MAX_STORED_NOTIFICATIONS: usize = 100;

pub type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

/// Handle returned by [`NotificationService::subscribe`].
///
/// Dropping it keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<ListenerRegistry>>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&self.id);
        }
    }
}

pub struct NotificationService {
    store: Arc<dyn KeyValueStore>,
    popup: Option<Arc<dyn PopupNotifier>>,
    registry: Arc<Mutex<ListenerRegistry>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn KeyValueStore>, popup: Option<Arc<dyn PopupNotifier>>) -> Self {
        Self {
            store,
            popup,
            registry: Arc::new(Mutex::new(ListenerRegistry::default())),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Builds a record without storing it.
    pub fn create_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        data: Option<JsonValue>,
    ) -> Notification {
        Notification::new(title, message, kind, data)
    }

    /// Prepends `notification`, trims the list to the cap and tells every
    /// listener. Listeners are skipped when the write fails.
    pub async fn save_notification(&self, notification: Notification) {
        {
            let _guard = self.write_lock.lock().await;

            let record = match serde_json::to_value(&notification) {
                Ok(record) => record,
                Err(e) => {
                    warn!(notification_id = %notification.id, error = %e, "Failed to encode notification");
                    return;
                }
            };

            let mut records = self.load_records().await;
            records.insert(0, record);
            records.truncate(MAX_STORED_NOTIFICATIONS);

            if let Err(e) = self.persist(&records).await {
                warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Failed to save notification"
                );
                return;
            }
        }

        debug!(notification_id = %notification.id, "Notification saved");

        self.notify_listeners(&notification);
    }

    /// The stored list, newest first. Empty when nothing is stored or the
    /// stored value cannot be read.
    ///
    /// Records that cannot be decoded are left out of the result but stay in
    /// storage.
    pub async fn load_notifications(&self) -> Vec<Notification> {
        self.load_records()
            .await
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Notification>(record) {
                Ok(notification) => Some(notification),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable notification record");
                    None
                }
            })
            .collect()
    }

    pub async fn mark_as_read(&self, notification_id: &str) {
        self.update(|records| {
            let mut changed = false;
            for fields in records
                .iter_mut()
                .filter_map(JsonValue::as_object_mut)
                .filter(|fields| record_id(fields) == Some(notification_id))
            {
                changed |= mark_read(fields);
            }
            changed
        })
        .await;
    }

    pub async fn mark_all_as_read(&self) {
        self.update(|records| {
            let mut changed = false;
            for fields in records.iter_mut().filter_map(JsonValue::as_object_mut) {
                changed |= mark_read(fields);
            }
            changed
        })
        .await;
    }

    pub async fn delete_notification(&self, notification_id: &str) {
        self.update(|records| {
            let before = records.len();
            records.retain(|record| {
                record.as_object().and_then(record_id) != Some(notification_id)
            });
            records.len() != before
        })
        .await;
    }

    pub async fn clear_all_notifications(&self) {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.store.remove_item(NOTIFICATIONS_STORAGE_KEY).await {
            warn!(error = %e, "Failed to clear notifications");
        }
    }

    pub async fn unread_count(&self) -> usize {
        self.load_notifications()
            .await
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    /// The list ordered by creation time for display, with the unread count.
    pub async fn load_feed(&self) -> NotificationFeed {
        NotificationFeed::from_notifications(self.load_notifications().await)
    }

    /// Registers `listener` to be called once for every saved notification.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Creates and stores a notification without a popup.
    pub async fn add_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        data: Option<JsonValue>,
    ) -> Notification {
        let notification = self.create_notification(title, message, kind, data);
        self.save_notification(notification.clone()).await;
        notification
    }

    /// Creates and stores a notification, then tries to show it as a popup.
    /// The record is stored first whatever happens to the popup.
    pub async fn show_local_notification(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        data: Option<JsonValue>,
    ) -> Notification {
        let notification = self.add_notification(title, message, kind, data).await;

        if let Some(popup) = &self.popup {
            if let Err(e) = popup.display(&notification).await {
                warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Popup notification failed, record already stored"
                );
            }
        }

        notification
    }

    pub async fn notify_payment_success(&self, purchase: &TicketPurchase) -> Notification {
        self.show_local_notification(
            "Payment Successful",
            purchase.message(),
            NotificationType::Ticket,
            Some(json!({
                "eventId": purchase.event_id,
                "eventName": purchase.event_name,
                "reservationId": purchase.reservation_id,
                "ticketType": purchase.ticket_type,
                "ticketQuantity": purchase.ticket_quantity,
            })),
        )
        .await
    }

    /// The stored list as raw JSON records, newest first.
    async fn load_records(&self) -> Vec<JsonValue> {
        let raw = match self.store.get_item(NOTIFICATIONS_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read notifications");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Stored notifications are not a JSON array");
                Vec::new()
            }
        }
    }

    /// Runs one read-modify-write cycle under the writer lock. `mutate`
    /// reports whether it changed anything; unchanged lists are not written.
    async fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Vec<JsonValue>) -> bool,
    {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load_records().await;
        if !mutate(&mut records) {
            return;
        }

        if let Err(e) = self.persist(&records).await {
            warn!(error = %e, "Failed to update notifications");
        }
    }

    async fn persist(&self, records: &[JsonValue]) -> Result<(), Error> {
        let raw = serde_json::to_string(records)?;
        self.store.set_item(NOTIFICATIONS_STORAGE_KEY, &raw).await
    }

    fn notify_listeners(&self, notification: &Notification) {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(notification);
        }
    }
}

fn record_id(fields: &Map<String, JsonValue>) -> Option<&str> {
    fields.get("id").and_then(JsonValue::as_str)
}

/// Sets `read` to `true`, reporting whether it was anything else before.
fn mark_read(fields: &mut Map<String, JsonValue>) -> bool {
    if fields.get("read") == Some(&JsonValue::Bool(true)) {
        return false;
    }
    fields.insert("read".to_string(), JsonValue::Bool(true));
    true
}
