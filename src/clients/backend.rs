use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result, anyhow};
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::{
    clients::storage::KeyValueStore,
    config::Config,
    models::{
        event::{Event, is_listable},
        pagination::Page,
        response::ApiFailure,
        retry::RetryConfig,
    },
    normalizer::normalize_page,
    utils::retry_with_backoff,
};

pub const TOKEN_STORAGE_KEY: &str = "TOKEN";

const TOKEN_POINTERS: [&str; 4] = ["/data/content/token", "/data/token", "/content/token", "/token"];
const SUCCESS_CODES: [&str; 2] = ["00", "SUCCESS"];
const TIMEOUT_MESSAGE: &str = "Request timeout. Please check your connection and try again.";

/// REST client for the ticketing gateway.
///
/// Shares the key-value store with the notification store so the session
/// token survives restarts.
pub struct BackendClient {
    http_client: Client,
    base_url: String,
    store: Arc<dyn KeyValueStore>,
    retry_config: RetryConfig,
}

impl BackendClient {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.api_timeout_ms))
            .build()
            .map_err(|_| anyhow!("Failed to create HTTP client"))?;

        info!(base_url = %config.api_base_url, "Backend client initialized");

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            store,
            retry_config: config.retry_config(),
        })
    }

    pub async fn set_token(&self, token: &str) -> Result<(), Error> {
        self.store.set_item(TOKEN_STORAGE_KEY, token).await
    }

    pub async fn remove_token(&self) -> Result<(), Error> {
        self.store.remove_item(TOKEN_STORAGE_KEY).await
    }

    async fn token(&self) -> Option<String> {
        match self.store.get_item(TOKEN_STORAGE_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read session token");
                None
            }
        }
    }

    /// GETs `endpoint` and returns the unwrapped payload.
    ///
    /// Empty query values are dropped. Transport errors and 5xx answers are
    /// retried; any other failure is returned as an [`ApiFailure`].
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<JsonValue, Error> {
        let url = format!("{}{}", self.base_url, endpoint);
        let query: Vec<(&str, &str)> = query
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        let token = self.token().await;

        debug!(url = %url, "Backend GET");

        let outcome = retry_with_backoff(&self.retry_config, || {
            let mut request = self
                .http_client
                .get(&url)
                .query(&query)
                .header(ACCEPT, "application/json")
                .header(CONTENT_TYPE, "application/json");
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }

            Self::send_once(request)
        })
        .await;

        let body = match outcome {
            Ok(Ok(body)) => body,
            Ok(Err(failure)) | Err(failure) => {
                debug!(url = %url, error = %failure, "Backend request failed");
                return Err(failure.into());
            }
        };

        if let Some(token) = extract_token(&body) {
            if let Err(e) = self.set_token(token).await {
                warn!(error = %e, "Failed to persist session token");
            }
        }

        Ok(unwrap_payload(body))
    }

    /// The outer error is retryable, the inner one is final.
    async fn send_once(request: RequestBuilder) -> Result<Result<JsonValue, ApiFailure>, ApiFailure> {
        let response = request.send().await.map_err(|e| ApiFailure {
            status: None,
            code: None,
            message: if e.is_timeout() {
                TIMEOUT_MESSAGE.to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let text = response.text().await.map_err(|e| ApiFailure {
            status: Some(status.as_u16()),
            code: None,
            message: e.to_string(),
        })?;

        let body = if !is_json {
            JsonValue::String(text)
        } else if text.is_empty() {
            JsonValue::Object(Map::new())
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(_) => {
                    return Ok(Err(ApiFailure {
                        status: Some(status.as_u16()),
                        code: None,
                        message: "Invalid JSON response from server".to_string(),
                    }));
                }
            }
        };

        if status.is_server_error() {
            return Err(failure_from(status, &body));
        }

        let code = body.get("code").and_then(code_as_string);
        let code_ok = code.as_deref().is_none_or(|c| SUCCESS_CODES.contains(&c));

        if status.is_success() && code_ok {
            Ok(Ok(body))
        } else {
            Ok(Err(failure_from(status, &body)))
        }
    }

    /// Fetches one page of a list endpoint and flattens its envelope.
    pub async fn fetch_page(&self, endpoint: &str, page: u32, size: u32) -> Result<Page, Error> {
        let payload = self
            .get(endpoint, &[("page", page.to_string()), ("size", size.to_string())])
            .await?;

        Ok(normalize_page(&payload, u64::from(page), u64::from(size)))
    }

    /// Like [`fetch_page`](Self::fetch_page), keeping only items with both an
    /// id and a name.
    pub async fn fetch_events(&self, endpoint: &str, page: u32, size: u32) -> Result<Page<Event>, Error> {
        let page = self.fetch_page(endpoint, page, size).await?;

        Ok(Page {
            items: page
                .items
                .iter()
                .filter(|item| is_listable(item))
                .map(|item| Event::from_record(item, None))
                .collect(),
            pagination: page.pagination,
        })
    }

    pub async fn check_health(&self) -> Result<(), Error> {
        let mut request = self.http_client.get(format!("{}/v1/event/health", self.base_url));
        if let Some(token) = self.token().await {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Backend unreachable: {}", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("HTTP error! status: {}", response.status().as_u16()))
        }
    }
}

fn code_as_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn failure_from(status: StatusCode, body: &JsonValue) -> ApiFailure {
    let text_field = |key: &str| {
        body.get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let message = text_field("message")
        .or_else(|| text_field("error"))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    ApiFailure {
        status: Some(status.as_u16()),
        code: body.get("code").and_then(code_as_string),
        message,
    }
}

fn extract_token(body: &JsonValue) -> Option<&str> {
    TOKEN_POINTERS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
}

/// `data`, else `content`, else the whole body.
fn unwrap_payload(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(mut fields) => {
            for key in ["data", "content"] {
                match fields.remove(key) {
                    Some(value) if !value.is_null() => return value,
                    Some(value) => {
                        fields.insert(key.to_string(), value);
                    }
                    None => {}
                }
            }
            JsonValue::Object(fields)
        }
        other => other,
    }
}
