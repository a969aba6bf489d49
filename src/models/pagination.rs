use serde::Serialize;
use serde_json::Value as JsonValue;

/// Pagination metadata for one fetched page.
///
/// `estimated` is set when the backend sent no totals and the numbers were
/// guessed from the page length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_pages: u64,
    pub total_elements: u64,
    pub current_page_index: u64,
    pub estimated: bool,
}

impl PageInfo {
    pub fn has_next(&self) -> bool {
        self.current_page_index.saturating_add(1) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page_index > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T = JsonValue> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}
