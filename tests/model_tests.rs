use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use tickbook_client::{
    config::{Config, StorageBackend},
    models::{
        event::{Event, format_price, is_listable},
        fcm::{ANDROID_CHANNEL_ID, FcmRequest},
        notification::{Notification, NotificationType},
        response::ApiFailure,
    },
    utils::format_relative_time,
};

/// Test: Event fields are read from snake_case and alternative aliases
#[test]
fn test_event_from_record_aliases() {
    let record = json!({
        "eventId": 77,
        "title": "Harbour Lights",
        "venue": "Pier 4",
        "event_date": "2025-08-01",
        "start_time": "19:30",
        "vip_price": "120.5",
        "general_ticket_price": 30,
        "general_limit": 500,
        "category": "Music",
        "imageUrl": "https://cdn.example.com/h.png"
    });

    let event = Event::from_record(&record, None);

    assert_eq!(event.id, "77");
    assert_eq!(event.name, "Harbour Lights");
    assert_eq!(event.location, "Pier 4");
    assert_eq!(event.date, "2025-08-01");
    assert_eq!(event.start_time, "19:30");
    assert_eq!(event.vip_ticket_price, 120.5);
    assert_eq!(event.general_ticket_price, 30.0);
    assert_eq!(event.general_ticket_limit, 500);
    assert_eq!(event.event_category, "Music");
    assert_eq!(event.event_status, "SCHEDULED");
    assert_eq!(event.image.as_deref(), Some("https://cdn.example.com/h.png"));
}

/// Test: Tier prices fall back to the ticketTypes list
#[test]
fn test_event_prices_from_ticket_types() {
    let record = json!({
        "id": "e1",
        "name": "Gala",
        "premiumTicketPrice": 80,
        "ticketTypes": [
            { "name": "vip", "price": 150 },
            { "name": "PREMIUM", "price": 999 },
            { "name": "General", "price": "25" }
        ]
    });

    let event = Event::from_record(&record, None);

    assert_eq!(event.vip_ticket_price, 150.0);
    assert_eq!(event.premium_ticket_price, 80.0, "explicit price wins");
    assert_eq!(event.general_ticket_price, 25.0);
    assert_eq!(event.price_display(), "€25 - €150");
}

/// Test: Missing fields take defaults and the fallback id
#[test]
fn test_event_defaults() {
    let event = Event::from_record(&json!({ "name": null }), Some("route-id"));

    assert_eq!(event.id, "route-id");
    assert_eq!(event.name, "Event");
    assert_eq!(event.event_category, "General");
    assert_eq!(event.price_display(), "Free");

    let placeholder = Event::from_record(&json!("oops"), None);
    assert_eq!(placeholder.id, "");
    assert_eq!(placeholder.name, "Event");
}

/// Test: Only items with a non-null id and name are listable
#[test]
fn test_is_listable() {
    assert!(is_listable(&json!({ "id": 1, "name": "A" })));
    assert!(!is_listable(&json!({ "id": 1 })));
    assert!(!is_listable(&json!({ "id": null, "name": "A" })));
    assert!(!is_listable(&json!("A")));
}

/// Test: Prices are grouped by thousands with trimmed decimals
#[test]
fn test_format_price() {
    assert_eq!(format_price(1234.0), "€1,234");
    assert_eq!(format_price(12.5), "€12.5");
    assert_eq!(format_price(1_000_000.125), "€1,000,000.125");
    assert_eq!(format_price(0.0), "€0");
}

/// Test: Relative time thresholds and pluralisation
#[test]
fn test_format_relative_time() {
    let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

    assert_eq!(format_relative_time(now - Duration::seconds(30), now), "Just now");
    assert_eq!(format_relative_time(now - Duration::minutes(1), now), "1 min ago");
    assert_eq!(format_relative_time(now - Duration::minutes(59), now), "59 mins ago");
    assert_eq!(format_relative_time(now - Duration::minutes(60), now), "1 hour ago");
    assert_eq!(format_relative_time(now - Duration::hours(23), now), "23 hours ago");
    assert_eq!(format_relative_time(now - Duration::hours(24), now), "1 day ago");
    assert_eq!(format_relative_time(now - Duration::days(6), now), "6 days ago");
    assert_eq!(format_relative_time(now - Duration::days(7), now), "Jun 8");
    assert_eq!(
        format_relative_time(Utc.with_ymd_and_hms(2024, 12, 31, 9, 0, 0).unwrap(), now),
        "Dec 31, 2024"
    );
}

/// Test: Future timestamps read as just now
#[test]
fn test_format_relative_time_future() {
    let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "Just now");
}

/// Test: Notification types parse leniently and serialise lowercase
#[test]
fn test_notification_type_strings() -> Result<()> {
    assert_eq!(NotificationType::from_string("ticket"), NotificationType::Ticket);
    assert_eq!(NotificationType::from_string("promo"), NotificationType::Promo);
    assert_eq!(NotificationType::from_string("event"), NotificationType::Event);
    assert_eq!(NotificationType::from_string(""), NotificationType::System);
    assert_eq!(NotificationType::from_string("TICKET"), NotificationType::System);

    let n = Notification::new("t", "m", NotificationType::Promo, None);
    let value = serde_json::to_value(&n)?;
    assert_eq!(value["type"], json!("promo"));
    assert_eq!(value["read"], json!(false));
    assert!(value.get("createdAt").is_some());
    assert!(value.get("data").is_none());

    Ok(())
}

/// Test: FCM payload stringifies data and tags the notification
#[test]
fn test_fcm_request_for_notification() -> Result<()> {
    let n = Notification::new(
        "Event Added to Favorites",
        "Gala has been added to your favorites.",
        NotificationType::Event,
        Some(json!({ "eventId": 12, "eventName": "Gala", "extra": null })),
    );

    let request = FcmRequest::for_notification("device-abc", &n);
    let value = serde_json::to_value(&request)?;

    assert_eq!(value["message"]["token"], json!("device-abc"));
    assert_eq!(value["message"]["notification"]["title"], json!("Event Added to Favorites"));
    assert_eq!(value["message"]["android"]["priority"], json!("high"));
    assert_eq!(
        value["message"]["android"]["notification"]["channel_id"],
        json!(ANDROID_CHANNEL_ID)
    );

    let data = &value["message"]["data"];
    assert_eq!(data["eventId"], json!("12"));
    assert_eq!(data["eventName"], json!("Gala"));
    assert_eq!(data["notificationId"], json!(n.id));
    assert_eq!(data["type"], json!("event"));
    assert!(data.get("extra").is_none());

    Ok(())
}

/// Test: Permission failures are recognised by status, code and message
#[test]
fn test_api_failure_permission_denied() {
    let failure = |status: Option<u16>, code: Option<&str>, message: &str| ApiFailure {
        status,
        code: code.map(str::to_string),
        message: message.to_string(),
    };

    assert!(failure(Some(401), None, "Unauthorized").is_permission_denied());
    assert!(failure(Some(403), None, "").is_permission_denied());
    assert!(failure(Some(200), Some("05"), "Denied").is_permission_denied());
    assert!(failure(Some(400), None, "Token expired, please log in").is_permission_denied());
    assert!(!failure(Some(404), None, "Not Found").is_permission_denied());
    assert!(!failure(None, None, "connection refused").is_permission_denied());
}

/// Test: Config defaults apply when only the base URL is set
#[test]
fn test_config_defaults() -> Result<()> {
    let config = Config::from_vars([("API_BASE_URL", "http://localhost:9000")])?;

    assert_eq!(config.api_timeout_ms, 30_000);
    assert_eq!(config.page_size, 10);
    assert_eq!(config.storage_backend()?, StorageBackend::File);
    assert_eq!(config.storage_path, ".tickbook");
    assert_eq!(config.server_port, 8080);
    assert!(config.fcm_target().is_none());

    Ok(())
}

/// Test: Invalid configurations are rejected
#[test]
fn test_config_validation() -> Result<()> {
    assert!(Config::from_vars(Vec::<(String, String)>::new()).is_err(), "base URL required");
    assert!(
        Config::from_vars([("API_BASE_URL", "http://x"), ("STORAGE_BACKEND", "redis")]).is_err(),
        "redis needs a URL"
    );
    assert!(Config::from_vars([("API_BASE_URL", "http://x"), ("STORAGE_BACKEND", "sqlite")]).is_err());
    assert!(Config::from_vars([("API_BASE_URL", "http://x"), ("MAX_RETRY_ATTEMPTS", "0")]).is_err());

    let with_fcm = Config::from_vars([
        ("API_BASE_URL", "http://x"),
        ("FCM_PROJECT_ID", "tickbook-prod"),
        ("FCM_DEVICE_TOKEN", "device-abc"),
    ])?;
    assert_eq!(with_fcm.fcm_target(), Some(("tickbook-prod", "device-abc")));

    Ok(())
}
