use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use piggybank_core::{AccountId, TransactionId};
use piggybank_infra::clients::TransactionRequest;

use crate::app::services::TwinServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(process_transaction))
        .route("/:id", get(get_transaction))
        .route("/by-account/:id", get(get_transactions_by_account))
}

pub async fn process_transaction(
    Extension(services): Extension<Arc<TwinServices>>,
    Json(body): Json<TransactionRequest>,
) -> axum::response::Response {
    match services.process_transaction(body) {
        Ok(applied) => {
            // 200 on an idempotent replay, 201 on first application.
            let status = if applied.replayed {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            (status, Json(dto::transaction_to_json(&applied.transaction))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<TwinServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: TransactionId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid transaction id");
        }
    };
    match services.transaction(&id) {
        Ok(Some(transaction)) => {
            (StatusCode::OK, Json(dto::transaction_to_json(&transaction))).into_response()
        }
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "transaction not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_transactions_by_account(
    Extension(services): Extension<Arc<TwinServices>>,
    Path(id): Path<String>,
    Query(page): Query<dto::PageParams>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    match services.transactions_by_account(&id, page.to_request()) {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::transaction_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
