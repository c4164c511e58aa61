use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use piggybank_core::AccountId;
use piggybank_infra::stores::PageRequest;

use crate::app::services::TwinServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_account).get(list_accounts))
        .route("/by-type-and-identifier", get(get_account_by_natural_key))
        .route("/:id", get(get_account).delete(delete_account))
        .route("/:id/balance", get(get_balance))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IncludeParams {
    #[serde(default)]
    include_transactions: bool,
}

pub async fn create_account(
    Extension(services): Extension<Arc<TwinServices>>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    match services
        .create_account(&body.account_type, &body.identifier, body.initial_balance)
        .await
    {
        Ok(account) => {
            (StatusCode::CREATED, Json(dto::account_to_json(&account))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<TwinServices>>,
) -> axum::response::Response {
    match services.accounts() {
        Ok(accounts) => {
            let items = accounts.iter().map(dto::account_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<TwinServices>>,
    Path(id): Path<String>,
    Query(params): Query<IncludeParams>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    account_response(&services, &id, params.include_transactions)
}

pub async fn get_account_by_natural_key(
    Extension(services): Extension<Arc<TwinServices>>,
    Query(key): Query<NaturalKeyParams>,
) -> axum::response::Response {
    match services.account_by_natural_key(&key.account_type, &key.identifier) {
        Ok(Some(account)) => account_response(&services, &account.id, key.include_transactions),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalKeyParams {
    #[serde(rename = "type")]
    account_type: String,
    identifier: String,
    #[serde(default)]
    include_transactions: bool,
}

pub async fn get_balance(
    Extension(services): Extension<Arc<TwinServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    match services.account(&id) {
        Ok(Some(account)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "accountId": account.id,
                "balance": account.balance,
            })),
        )
            .into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_account(
    Extension(services): Extension<Arc<TwinServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: AccountId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"),
    };
    match services.delete_account(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn account_response(
    services: &TwinServices,
    id: &AccountId,
    include_transactions: bool,
) -> axum::response::Response {
    let account = match services.account(id) {
        Ok(Some(account)) => account,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "account not found");
        }
        Err(e) => return errors::service_error_to_response(e),
    };

    if !include_transactions {
        return (StatusCode::OK, Json(dto::account_to_json(&account))).into_response();
    }

    match services.transactions_by_account(id, PageRequest::unpaged()) {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::account_with_transactions_to_json(&account, &page.items)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
