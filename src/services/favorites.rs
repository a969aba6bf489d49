use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tracing::debug;

use crate::{
    models::{event::Event, notification::NotificationType},
    services::notifications::NotificationService,
};

/// Favorite events for the running session.
///
/// Held in memory only and gone after a restart; the notifications emitted on
/// add and remove are persisted through [`NotificationService`] like any other.
pub struct FavoritesService {
    favorites: Mutex<Vec<Event>>,
    notifications: Arc<NotificationService>,
}

impl FavoritesService {
    pub fn new(notifications: Arc<NotificationService>) -> Self {
        Self {
            favorites: Mutex::new(Vec::new()),
            notifications,
        }
    }

    pub fn favorites(&self) -> Vec<Event> {
        self.favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_favorite(&self, event_id: &str) -> bool {
        self.favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e.id == event_id)
    }

    /// Returns `false` without notifying when the event is already a
    /// favorite.
    pub async fn add_favorite(&self, event: Event) -> bool {
        {
            let mut favorites = self.favorites.lock().unwrap_or_else(PoisonError::into_inner);
            if favorites.iter().any(|e| e.id == event.id) {
                return false;
            }
            favorites.push(event.clone());
        }

        debug!(event_id = %event.id, "Event added to favorites");

        self.notifications
            .show_local_notification(
                "Event Added to Favorites",
                format!("{} has been added to your favorites.", display_name(&event)),
                NotificationType::Event,
                Some(json!({ "eventId": event.id, "eventName": event.name })),
            )
            .await;

        true
    }

    /// Returns `false` without notifying when the event was not a favorite.
    pub async fn remove_favorite(&self, event_id: &str) -> bool {
        let removed = {
            let mut favorites = self.favorites.lock().unwrap_or_else(PoisonError::into_inner);
            match favorites.iter().position(|e| e.id == event_id) {
                Some(index) => favorites.remove(index),
                None => return false,
            }
        };

        debug!(event_id = %removed.id, "Event removed from favorites");

        self.notifications
            .show_local_notification(
                "Event Removed from Favorites",
                format!("{} has been removed from your favorites.", display_name(&removed)),
                NotificationType::Event,
                Some(json!({ "eventId": removed.id, "eventName": removed.name })),
            )
            .await;

        true
    }

    /// Returns whether the event is a favorite afterwards.
    pub async fn toggle_favorite(&self, event: Event) -> bool {
        if self.is_favorite(&event.id) {
            self.remove_favorite(&event.id).await;
            false
        } else {
            self.add_favorite(event).await;
            true
        }
    }
}

fn display_name(event: &Event) -> &str {
    if event.name.is_empty() { "Event" } else { &event.name }
}
