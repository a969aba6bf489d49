use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

use crate::models::pagination::PageInfo;

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub estimated: bool,
}

impl PaginationMeta {
    pub fn from_page_info(info: &PageInfo, limit: u64) -> Self {
        Self {
            total: info.total_elements,
            limit,
            page: info.current_page_index,
            total_pages: info.total_pages,
            has_next: info.has_next(),
            has_previous: info.has_previous(),
            estimated: info.estimated,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message,
            meta: None,
        }
    }

    pub fn error(error: String, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            message,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: PaginationMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A backend call that reached the server but was rejected, either by HTTP
/// status or by the gateway's `code` field.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

const PERMISSION_HINTS: [&str; 6] = [
    "access denied",
    "permission",
    "forbidden",
    "unauthorized",
    "invalid token",
    "token expired",
];

impl ApiFailure {
    /// Session expired or access denied. List screens show an empty state
    /// for these instead of an error.
    pub fn is_permission_denied(&self) -> bool {
        if matches!(self.status, Some(401) | Some(403)) || self.code.as_deref() == Some("05") {
            return true;
        }

        let message = self.message.to_lowercase();
        PERMISSION_HINTS.iter().any(|hint| message.contains(hint))
    }
}

impl Display for ApiFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (self.status, self.code.as_deref()) {
            (Some(status), Some(code)) => write!(f, "{} (status {}, code {})", self.message, status, code),
            (Some(status), None) => write!(f, "{} (status {})", self.message, status),
            (None, Some(code)) => write!(f, "{} (code {})", self.message, code),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiFailure {}
