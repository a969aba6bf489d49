use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::utils::{format_relative_time, generate_notification_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Ticket,
    Promo,
    #[default]
    System,
    Event,
}

impl NotificationType {
    /// Unknown or empty strings map to `System`, matching how older records
    /// are read back.
    pub fn from_string(s: &str) -> Self {
        match s {
            "ticket" => NotificationType::Ticket,
            "promo" => NotificationType::Promo,
            "event" => NotificationType::Event,
            _ => NotificationType::System,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Ticket => "ticket",
            NotificationType::Promo => "promo",
            NotificationType::System => "system",
            NotificationType::Event => "event",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A user-facing notification as persisted under the notifications key.
///
/// Field names on the wire are camelCase so lists written by earlier app
/// versions keep loading. `read`, `type` and `createdAt` are read leniently:
/// missing or malformed values fall back to `false`, `system` and `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub message: String,

    /// Relative time computed once at creation. Not refreshed on load.
    #[serde(default)]
    pub time: String,

    #[serde(rename = "type", default, deserialize_with = "lenient_type")]
    pub kind: NotificationType,

    #[serde(default, deserialize_with = "lenient_read")]
    pub read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        data: Option<JsonValue>,
    ) -> Self {
        Self::with_timestamp(title, message, kind, data, Utc::now())
    }

    pub fn with_timestamp(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        data: Option<JsonValue>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_notification_id(now),
            title: title.into(),
            message: message.into(),
            time: format_relative_time(now, now),
            kind,
            read: false,
            data,
            created_at: Some(now),
        }
    }
}

fn lenient_type<'de, D>(deserializer: D) -> Result<NotificationType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(JsonValue::as_str)
        .map(NotificationType::from_string)
        .unwrap_or_default())
}

fn lenient_read<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(JsonValue::as_bool).unwrap_or(false))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(JsonValue::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// What the notifications screen renders: newest first by creation time, plus
/// the unread badge count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationFeed {
    pub fn from_notifications(mut notifications: Vec<Notification>) -> Self {
        // Stable sort, records without a timestamp go last.
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let unread_count = notifications.iter().filter(|n| !n.read).count();

        Self {
            notifications,
            unread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPurchase {
    pub event_id: String,
    pub event_name: String,

    #[serde(default)]
    pub reservation_id: Option<JsonValue>,

    pub ticket_type: String,
    pub ticket_quantity: u32,
}

impl TicketPurchase {
    pub fn message(&self) -> String {
        format!(
            "You successfully bought {} {} ticket{} for {}.",
            self.ticket_quantity,
            self.ticket_type,
            if self.ticket_quantity > 1 { "s" } else { "" },
            self.event_name
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub title: String,
    pub message: String,

    #[serde(rename = "type", default, deserialize_with = "lenient_type")]
    pub kind: NotificationType,

    #[serde(default)]
    pub data: Option<JsonValue>,
}
