use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::GatewayServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route(
        "/",
        get(list_monitored_accounts)
            .post(add_monitored_account)
            .delete(remove_monitored_account),
    )
}

pub async fn list_monitored_accounts(
    Extension(services): Extension<Arc<GatewayServices>>,
) -> axum::response::Response {
    let items = services
        .monitored()
        .iter()
        .map(dto::monitored_account_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn add_monitored_account(
    Extension(services): Extension<Arc<GatewayServices>>,
    Json(body): Json<dto::MonitoredAccountRequest>,
) -> axum::response::Response {
    let account = match body.account.into_ref() {
        Ok(account) => account,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    if services.register(account.clone()) {
        (StatusCode::CREATED, Json(dto::monitored_account_to_json(&account))).into_response()
    } else {
        errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("account {account} is already monitored"),
        )
    }
}

pub async fn remove_monitored_account(
    Extension(services): Extension<Arc<GatewayServices>>,
    Json(body): Json<dto::MonitoredAccountRequest>,
) -> axum::response::Response {
    let account = match body.account.into_ref() {
        Ok(account) => account,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    if services.unregister(&account) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("account {account} is not monitored"),
        )
    }
}
