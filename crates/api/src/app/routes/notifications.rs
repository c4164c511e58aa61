use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use piggybank_core::{AccountId, NotificationId};
use piggybank_infra::stores::NotificationFilter;

use crate::app::routes::event_stream;
use crate::app::services::NotificationServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread", get(list_unread_notifications))
        .route("/count", get(count_unread))
        .route("/stream", get(event_stream::notification_stream))
        .route("/account/:id", get(list_account_notifications))
        .route("/account/:id/unread", get(list_account_unread_notifications))
        .route("/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<NotificationServices>>,
    Query(page): Query<dto::PageParams>,
) -> axum::response::Response {
    page_response(&services, NotificationFilter::default(), &page)
}

pub async fn list_unread_notifications(
    Extension(services): Extension<Arc<NotificationServices>>,
    Query(page): Query<dto::PageParams>,
) -> axum::response::Response {
    page_response(
        &services,
        NotificationFilter {
            unread_only: true,
            ..Default::default()
        },
        &page,
    )
}

pub async fn list_account_notifications(
    Extension(services): Extension<Arc<NotificationServices>>,
    Path(id): Path<String>,
    Query(page): Query<dto::PageParams>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    page_response(
        &services,
        NotificationFilter {
            account_id: Some(id),
            unread_only: false,
        },
        &page,
    )
}

pub async fn list_account_unread_notifications(
    Extension(services): Extension<Arc<NotificationServices>>,
    Path(id): Path<String>,
    Query(page): Query<dto::PageParams>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    page_response(
        &services,
        NotificationFilter {
            account_id: Some(id),
            unread_only: true,
        },
        &page,
    )
}

pub async fn count_unread(
    Extension(services): Extension<Arc<NotificationServices>>,
) -> axum::response::Response {
    match services.count_unread() {
        Ok(count) => {
            (StatusCode::OK, Json(serde_json::json!({ "count": count }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<NotificationServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: NotificationId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid notification id");
        }
    };
    match services.mark_read(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "notification not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn page_response(
    services: &NotificationServices,
    filter: NotificationFilter,
    page: &dto::PageParams,
) -> axum::response::Response {
    match services.notifications_page(filter, page.to_request()) {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::notification_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
