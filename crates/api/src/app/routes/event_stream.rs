//! Live notification feed (SSE) for the UI.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Extension, Query};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::Deserialize;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use crate::app::services::NotificationServices;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    /// Restrict the feed to one account's notifications.
    pub account_id: Option<String>,
}

/// Stream notification events (created and read-flag updates) as they happen.
///
/// Lossy by design: a slow consumer misses events rather than applying
/// backpressure to the notification pipeline.
pub async fn notification_stream(
    Extension(services): Extension<Arc<NotificationServices>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.subscribe_realtime();
    let account_filter = params.account_id;

    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(event)
            if account_filter
                .as_deref()
                .is_none_or(|id| event.account_id.as_str() == id) =>
        {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event("notification.created").data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
