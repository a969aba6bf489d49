use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::notification::Notification;

pub const ANDROID_CHANNEL_ID: &str = "favorites_channel";
pub const ACCENT_COLOR: &str = "#6366f1";
pub const ANDROID_ICON: &str = "ic_launcher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmRequest {
    pub message: FcmMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmMessage {
    pub token: String,
    pub notification: FcmNotification,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,

    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidNotification {
    pub channel_id: String,
    pub sound: String,
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aps {
    pub sound: String,
}

impl FcmRequest {
    pub fn for_notification(device_token: &str, notification: &Notification) -> Self {
        // FCM data values must be strings.
        let mut data: HashMap<String, String> = match &notification.data {
            Some(JsonValue::Object(fields)) => fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let value = match v {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect(),
            _ => HashMap::new(),
        };
        data.insert("notificationId".to_string(), notification.id.clone());
        data.insert("type".to_string(), notification.kind.to_string());

        Self {
            message: FcmMessage {
                token: device_token.to_string(),
                notification: FcmNotification {
                    title: notification.title.clone(),
                    body: notification.message.clone(),
                },
                data: Some(data),
                android: AndroidConfig {
                    priority: "high".to_string(),
                    notification: AndroidNotification {
                        channel_id: ANDROID_CHANNEL_ID.to_string(),
                        sound: "default".to_string(),
                        color: ACCENT_COLOR.to_string(),
                        icon: ANDROID_ICON.to_string(),
                    },
                },
                apns: ApnsConfig {
                    payload: ApnsPayload {
                        aps: Aps {
                            sound: "default".to_string(),
                        },
                    },
                },
            },
        }
    }
}
