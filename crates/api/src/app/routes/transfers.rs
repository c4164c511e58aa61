use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use piggybank_core::TransferId;
use piggybank_transfers::Transfer;

use crate::app::services::{GatewayServices, TransferOutcome};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(submit_transfer))
}

pub async fn submit_transfer(
    Extension(services): Extension<Arc<GatewayServices>>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    if body.purpose.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "purpose is required");
    }

    let source_account = match body.source_account.into_ref() {
        Ok(account) => account,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    let target_account = match body.target_account.into_ref() {
        Ok(account) => account,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    let transfer = Transfer {
        id: TransferId::new(),
        source_account,
        target_account,
        amount: body.amount,
        valuation_timestamp: body.valuation_timestamp,
        purpose: body.purpose,
    };
    let transfer_id = transfer.id;

    match services.process_transfer(transfer).await {
        Ok(outcome) => {
            let (status, forwarded) = match outcome {
                TransferOutcome::Unmonitored => ("UNMONITORED", 0),
                TransferOutcome::Forwarded { legs } => ("FORWARDED", legs),
            };
            (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "transferId": transfer_id,
                    "status": status,
                    "forwardedTransactions": forwarded,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
