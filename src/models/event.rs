use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Typed view over a raw event mapping from the backend.
///
/// The backend is inconsistent about casing and field names, so every field
/// is read from a list of aliases and the first non-null one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub location: String,
    pub date: String,
    pub start_time: String,
    pub vip_ticket_price: f64,
    pub premium_ticket_price: f64,
    pub general_ticket_price: f64,
    pub vip_ticket_limit: u64,
    pub premium_ticket_limit: u64,
    pub general_ticket_limit: u64,
    pub event_category: String,
    pub event_status: String,
    pub image: Option<String>,
}

const DEFAULT_NAME: &str = "Event";
const DEFAULT_CATEGORY: &str = "General";
const DEFAULT_STATUS: &str = "SCHEDULED";

impl Event {
    pub fn from_record(record: &JsonValue, fallback_id: Option<&str>) -> Self {
        let Some(fields) = record.as_object() else {
            return Self::placeholder(fallback_id.unwrap_or_default());
        };

        let mut vip_price = number_field(fields, &["vipTicketPrice", "vip_ticket_price", "vipPrice", "vip_price"]);
        let mut premium_price = number_field(
            fields,
            &["premiumTicketPrice", "premium_ticket_price", "premiumPrice", "premium_price"],
        );
        let mut general_price = number_field(
            fields,
            &["generalTicketPrice", "general_ticket_price", "generalPrice", "general_price", "price"],
        );

        if let Some(ticket_types) = lookup(fields, &["ticketTypes"]).and_then(JsonValue::as_array) {
            for ticket_type in ticket_types {
                let name = ticket_type
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_uppercase();
                let price = ticket_type.get("price").map(as_number).unwrap_or(0.0);

                match name.as_str() {
                    "VIP" if vip_price == 0.0 => vip_price = price,
                    "PREMIUM" if premium_price == 0.0 => premium_price = price,
                    "GENERAL" if general_price == 0.0 => general_price = price,
                    _ => {}
                }
            }
        }

        let id = text_field(fields, &["id", "eventId"])
            .or_else(|| fallback_id.filter(|id| !id.is_empty()).map(str::to_string))
            .unwrap_or_default();

        Self {
            id,
            name: text_field(fields, &["name", "title", "event_name"])
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            slug: text_field(fields, &["slug", "event_slug"]).unwrap_or_default(),
            description: text_field(fields, &["description", "event_description"])
                .unwrap_or_default(),
            location: text_field(fields, &["location", "venue", "event_location"])
                .unwrap_or_default(),
            date: text_field(fields, &["date", "event_date"]).unwrap_or_default(),
            start_time: text_field(fields, &["startTime", "start_time", "time"]).unwrap_or_default(),
            vip_ticket_price: vip_price,
            premium_ticket_price: premium_price,
            general_ticket_price: general_price,
            vip_ticket_limit: limit_field(fields, &["vipTicketLimit", "vip_ticket_limit", "vipLimit", "vip_limit"]),
            premium_ticket_limit: limit_field(
                fields,
                &["premiumTicketLimit", "premium_ticket_limit", "premiumLimit", "premium_limit"],
            ),
            general_ticket_limit: limit_field(
                fields,
                &["generalTicketLimit", "general_ticket_limit", "generalLimit", "general_limit", "limit"],
            ),
            event_category: text_field(fields, &["eventCategory", "event_category", "category"])
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            event_status: text_field(fields, &["eventStatus", "event_status", "status"])
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            image: text_field(fields, &["imageUrl", "image_url", "image"]),
        }
    }

    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: DEFAULT_NAME.to_string(),
            slug: String::new(),
            description: String::new(),
            location: String::new(),
            date: String::new(),
            start_time: String::new(),
            vip_ticket_price: 0.0,
            premium_ticket_price: 0.0,
            general_ticket_price: 0.0,
            vip_ticket_limit: 0,
            premium_ticket_limit: 0,
            general_ticket_limit: 0,
            event_category: String::new(),
            event_status: DEFAULT_STATUS.to_string(),
            image: None,
        }
    }

    /// `Free`, a single price, or `min - max` over the non-zero tiers.
    pub fn price_display(&self) -> String {
        let prices: Vec<f64> = [
            self.general_ticket_price,
            self.premium_ticket_price,
            self.vip_ticket_price,
        ]
        .into_iter()
        .filter(|p| *p > 0.0)
        .collect();

        if prices.is_empty() {
            return "Free".to_string();
        }

        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if min == max {
            format_price(min)
        } else {
            format!("{} - {}", format_price(min), format_price(max))
        }
    }
}

/// List screens drop items that lack either an `id` or a `name`.
pub fn is_listable(item: &JsonValue) -> bool {
    let present = |key: &str| item.get(key).is_some_and(|v| !v.is_null());
    present("id") && present("name")
}

/// Euro amount with thousands separators and at most three decimals.
pub fn format_price(price: f64) -> String {
    let rounded = format!("{:.3}", price.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let fraction = fraction.trim_end_matches('0');
    let sign = if price < 0.0 { "-" } else { "" };

    if fraction.is_empty() {
        format!("€{}{}", sign, grouped)
    } else {
        format!("€{}{}.{}", sign, grouped, fraction)
    }
}

fn lookup<'a>(fields: &'a Map<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(fields: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    let text = match lookup(fields, keys)? {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        _ => return None,
    };

    (!text.is_empty()).then_some(text)
}

fn number_field(fields: &Map<String, JsonValue>, keys: &[&str]) -> f64 {
    lookup(fields, keys).map(as_number).unwrap_or(0.0)
}

fn limit_field(fields: &Map<String, JsonValue>, keys: &[&str]) -> u64 {
    let value = number_field(fields, keys);
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn as_number(value: &JsonValue) -> f64 {
    match value {
        JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
        JsonValue::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
