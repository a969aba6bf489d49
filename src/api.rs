use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    clients::{
        backend::BackendClient, fcm::FcmPopupNotifier, health::HealthChecker,
        popup::PopupNotifier, storage::build_store,
    },
    config::Config,
    models::{
        event::Event,
        health::HealthStatus,
        notification::{CreateNotification, NotificationFeed},
        pagination::PageInfo,
        response::{ApiFailure, ApiResponse, PaginationMeta},
    },
    services::{favorites::FavoritesService, notifications::NotificationService},
};

const EVENTS_ENDPOINT: &str = "/v1/event";

/// Everything the handlers share, built once at startup.
pub struct AppState {
    pub notifications: Arc<NotificationService>,
    pub favorites: Arc<FavoritesService>,
    pub backend: Arc<BackendClient>,
    pub health_checker: HealthChecker,
    pub page_size: u32,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let store = build_store(config).await?;

        let popup = FcmPopupNotifier::from_config(config)?
            .map(|notifier| Arc::new(notifier) as Arc<dyn PopupNotifier>);
        if popup.is_none() {
            info!("No FCM target configured, popups disabled");
        }

        let notifications = Arc::new(NotificationService::new(store.clone(), popup));
        let favorites = Arc::new(FavoritesService::new(notifications.clone()));
        let backend = Arc::new(BackendClient::new(config, store.clone())?);
        let health_checker = HealthChecker::new(store, backend.clone());

        Ok(Self {
            notifications,
            favorites,
            backend,
            health_checker,
            page_size: config.page_size,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/notifications",
            get(list_notifications)
                .post(create_notification)
                .delete(clear_notifications),
        )
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/notifications/{id}", delete(delete_notification))
        .route("/favorites", get(list_favorites))
        .route("/favorites/toggle", post(toggle_favorite))
        .route("/events", get(list_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: Config) -> Result<(), Error> {
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn feed_response(state: &AppState, message: &str) -> Json<ApiResponse<NotificationFeed>> {
    let feed = state.notifications.load_feed().await;
    Json(ApiResponse::success(feed, message.to_string()))
}

async fn list_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    feed_response(&state, "Notifications loaded").await
}

async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateNotification>,
) -> impl IntoResponse {
    let notification = state
        .notifications
        .show_local_notification(body.title, body.message, body.kind, body.data)
        .await;

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            notification,
            "Notification created".to_string(),
        )),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnreadCount {
    unread_count: usize,
}

async fn unread_count(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let unread_count = state.notifications.unread_count().await;
    Json(ApiResponse::success(
        UnreadCount { unread_count },
        "Unread count loaded".to_string(),
    ))
}

async fn mark_read(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> impl IntoResponse {
    state.notifications.mark_as_read(&id).await;
    feed_response(&state, "Notification marked as read").await
}

async fn mark_all_read(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.notifications.mark_all_as_read().await;
    feed_response(&state, "All notifications marked as read").await
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.notifications.delete_notification(&id).await;
    feed_response(&state, "Notification deleted").await
}

async fn clear_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.notifications.clear_all_notifications().await;
    feed_response(&state, "Notifications cleared").await
}

async fn list_favorites(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::success(
        state.favorites.favorites(),
        "Favorites loaded".to_string(),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteToggled {
    is_favorite: bool,
    favorites: Vec<Event>,
}

async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Json(record): Json<JsonValue>,
) -> Response {
    let event = Event::from_record(&record, None);
    if event.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                "Missing event id".to_string(),
                "Event record must carry an id".to_string(),
            )),
        )
            .into_response();
    }

    let is_favorite = state.favorites.toggle_favorite(event).await;

    Json(ApiResponse::success(
        FavoriteToggled {
            is_favorite,
            favorites: state.favorites.favorites(),
        },
        "Favorite updated".to_string(),
    ))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    page: Option<u32>,
    size: Option<u32>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let page = query.page.unwrap_or(0);
    let size = query.size.unwrap_or(state.page_size);

    match state.backend.fetch_events(EVENTS_ENDPOINT, page, size).await {
        Ok(events) => {
            let meta = PaginationMeta::from_page_info(&events.pagination, u64::from(size));
            Json(ApiResponse::success(events.items, "Events loaded".to_string()).with_meta(meta))
                .into_response()
        }
        Err(e) => {
            // Expired sessions show an empty list rather than an error.
            if e.downcast_ref::<ApiFailure>().is_some_and(ApiFailure::is_permission_denied) {
                warn!(error = %e, "Event listing denied, returning empty page");
                let empty = PageInfo {
                    total_pages: 0,
                    total_elements: 0,
                    current_page_index: 0,
                    estimated: false,
                };
                return Json(
                    ApiResponse::success(Vec::<Event>::new(), "No events available".to_string())
                        .with_meta(PaginationMeta::from_page_info(&empty, u64::from(size))),
                )
                .into_response();
            }

            warn!(error = %e, "Failed to load events");
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::<()>::error(
                    e.to_string(),
                    "Failed to load events".to_string(),
                )),
            )
                .into_response()
        }
    }
}
