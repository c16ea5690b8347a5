//! The caller's own notifications; every role has an inbox.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde_json::json;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

use kopontren_infra::notify::NotificationId;
use kopontren_infra::services::{NotificationFilter, Services};

use crate::app::{dto, errors::ApiError};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/stream", get(stream))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Query(filter): Query<NotificationFilter>,
    Query(page): Query<dto::PageQuery>,
) -> impl IntoResponse {
    Json(services.list_notifications(principal.principal(), filter, page.into()).await)
}

pub async fn unread_count(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    let count = services.unread_notification_count(principal.principal()).await;
    Json(json!({ "count": count }))
}

pub async fn mark_read(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<NotificationId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.mark_notification_read(principal.principal(), id).await?))
}

pub async fn mark_all_read(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = services.mark_all_notifications_read(principal.principal()).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// Server-sent events: the caller's notifications as they are created.
pub async fn stream(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let user_id = principal.user_id();
    // Lagged receivers skip what they missed; the list endpoint has the full history.
    let stream = BroadcastStream::new(services.subscribe()).filter_map(move |msg| match msg {
        Ok(m) if m.user_id == user_id => Some(Ok(SseEvent::default().event(m.topic).data(m.payload.to_string()))),
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
