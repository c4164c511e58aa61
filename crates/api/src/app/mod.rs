//! HTTP application wiring (axum routers + service wiring).
//!
//! This folder is structured like:
//! - `services.rs`: orchestration (stores, bus, inter-service clients)
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{GatewayServices, NotificationServices, TwinServices};

/// Build the account-twin service router.
pub fn build_twin_app(services: Arc<TwinServices>) -> Router {
    routes::twin_router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}

/// Build the transfer-gateway router.
pub fn build_gateway_app(services: Arc<GatewayServices>) -> Router {
    routes::gateway_router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}

/// Build the notification-service router.
///
/// The caller decides when to start the bus consumer
/// ([`NotificationServices::spawn_consumer`]); building the router is pure.
pub fn build_notification_app(services: Arc<NotificationServices>) -> Router {
    routes::notification_router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
