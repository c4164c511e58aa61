use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use piggybank_core::{AccountId, SubscriptionId};

use crate::app::services::NotificationServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_subscription).get(list_subscriptions))
        .route("/account/:id", get(list_account_subscriptions))
        .route("/:id", delete(deactivate_subscription))
}

pub async fn create_subscription(
    Extension(services): Extension<Arc<NotificationServices>>,
    Json(body): Json<dto::CreateSubscriptionRequest>,
) -> axum::response::Response {
    let account_id: AccountId = match body.account_id.parse() {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string());
        }
    };

    match services.create_subscription(account_id, body.event_type) {
        Ok(subscription) => (
            StatusCode::CREATED,
            Json(dto::subscription_to_json(&subscription)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_subscriptions(
    Extension(services): Extension<Arc<NotificationServices>>,
) -> axum::response::Response {
    match services.active_subscriptions() {
        Ok(subscriptions) => list_response(&subscriptions),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_account_subscriptions(
    Extension(services): Extension<Arc<NotificationServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    match services.subscriptions_for_account(&id) {
        Ok(subscriptions) => list_response(&subscriptions),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn deactivate_subscription(
    Extension(services): Extension<Arc<NotificationServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SubscriptionId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid subscription id");
        }
    };
    match services.deactivate_subscription(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "subscription not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn list_response(
    subscriptions: &[piggybank_notifications::NotificationSubscription],
) -> axum::response::Response {
    let items = subscriptions
        .iter()
        .map(dto::subscription_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
