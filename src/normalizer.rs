//! Flattening of the backend's list envelopes.
//!
//! List endpoints answer with a bare array, a Spring-style page
//! (`{content: [...], totalPages, ...}`), the gateway wrapper around a page
//! (`{code, content: {content: [...], ...}}`), or occasionally an object
//! keyed by `events`, `items` or `results`. Everything here is total: an
//! unrecognised payload yields no items rather than an error.

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::models::pagination::{Page, PageInfo};

const FALLBACK_LIST_KEYS: [&str; 3] = ["events", "items", "results"];
const PAGE_INDEX_KEYS: [&str; 3] = ["number", "pageNumber", "page"];

struct Located<'a> {
    items: &'a [JsonValue],
    /// Mappings to read pagination metadata from, innermost first.
    levels: Vec<&'a Map<String, JsonValue>>,
}

fn locate(payload: &JsonValue) -> Option<Located<'_>> {
    let outer = match payload {
        JsonValue::Array(items) => {
            return Some(Located {
                items,
                levels: Vec::new(),
            });
        }
        JsonValue::Object(outer) => outer,
        _ => return None,
    };

    // The gateway wrapper (`code` + `content`) and a plain page unwrap the
    // same way, so one branch serves both.
    if let Some(content) = outer.get("content") {
        return match content {
            JsonValue::Array(items) => Some(Located {
                items,
                levels: vec![outer],
            }),
            JsonValue::Object(page) => match page.get("content") {
                Some(JsonValue::Array(items)) => Some(Located {
                    items,
                    levels: vec![page, outer],
                }),
                _ => None,
            },
            _ => None,
        };
    }

    FALLBACK_LIST_KEYS.iter().find_map(|key| match outer.get(*key) {
        Some(JsonValue::Array(items)) => Some(Located {
            items,
            levels: vec![outer],
        }),
        _ => None,
    })
}

/// Returns the list items carried by `payload`, in order.
pub fn extract_items(payload: &JsonValue) -> Vec<JsonValue> {
    match locate(payload) {
        Some(located) => located.items.to_vec(),
        None => {
            debug!("No list shape matched response payload");
            Vec::new()
        }
    }
}

/// Reads pagination totals from the level that held the items, estimating
/// them from the page length when the backend sent none.
pub fn extract_pagination(payload: &JsonValue, requested_page: u64, page_size: u64) -> PageInfo {
    let located = locate(payload);
    let (len, levels) = match &located {
        Some(located) => (located.items.len() as u64, located.levels.as_slice()),
        None => (0, &[][..]),
    };

    let total_pages = read_count(levels, &["totalPages"]);
    let total_elements = read_count(levels, &["totalElements"]);
    let page_index = read_count(levels, &PAGE_INDEX_KEYS);

    if total_pages.is_none() && total_elements.is_none() {
        let full_page = page_size > 0 && len == page_size;

        return PageInfo {
            total_pages: if full_page {
                requested_page.saturating_add(2)
            } else {
                requested_page.saturating_add(1)
            },
            total_elements: requested_page.saturating_mul(page_size).saturating_add(len),
            current_page_index: requested_page,
            estimated: true,
        };
    }

    // Totals come straight from the backend and may be absurdly large.
    let total_elements =
        total_elements.unwrap_or_else(|| total_pages.unwrap_or(0).saturating_mul(page_size));
    let total_pages = total_pages.unwrap_or_else(|| pages_for(total_elements, page_size));

    PageInfo {
        total_pages,
        total_elements,
        current_page_index: page_index.unwrap_or(requested_page),
        estimated: false,
    }
}

pub fn normalize_page(payload: &JsonValue, requested_page: u64, page_size: u64) -> Page {
    Page {
        items: extract_items(payload),
        pagination: extract_pagination(payload, requested_page, page_size),
    }
}

fn pages_for(total_elements: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return u64::from(total_elements > 0);
    }
    total_elements.div_ceil(page_size)
}

fn read_count(levels: &[&Map<String, JsonValue>], keys: &[&str]) -> Option<u64> {
    keys.iter()
        .flat_map(|key| levels.iter().filter_map(move |level| level.get(*key)))
        .find_map(as_count)
}

fn as_count(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
