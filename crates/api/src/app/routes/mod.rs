//! HTTP routes, one file per resource.

use axum::{Router, routing::get};

pub mod event_stream;
pub mod monitored_accounts;
pub mod notifications;
pub mod subscriptions;
pub mod system;
pub mod transactions;
pub mod transfers;
pub mod twin_accounts;

/// Routes served by the account-twin service.
pub fn twin_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/accounts", twin_accounts::router())
        .nest("/api/transactions", transactions::router())
}

/// Routes served by the transfer gateway.
pub fn gateway_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/accounts", monitored_accounts::router())
        .nest("/api/transfers", transfers::router())
}

/// Routes served by the notification service.
pub fn notification_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/notifications", notifications::router())
        .nest("/api/subscriptions", subscriptions::router())
}
