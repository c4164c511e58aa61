use std::sync::Arc;

use axum::Router;

use piggybank_api::app::{
    self,
    services::{GatewayServices, NotificationServices, SharedBus, TwinServices},
};
use piggybank_events::{Envelope, InMemoryEventBus};
use piggybank_infra::clients::{HttpGatewayClient, HttpTwinClient};
use piggybank_infra::stores::{
    InMemoryNotificationStore, InMemorySubscriptionStore, InMemoryTwinStore, PostgresTwinStore,
    TwinStore,
};
use piggybank_transfers::MonitoredAccounts;

/// Hosts the three services on three listeners. With the default in-memory
/// bus the whole pipeline runs inside this process; enable the `redis`
/// feature and set `REDIS_URL` to fan events out across processes instead.
#[tokio::main]
async fn main() {
    piggybank_observability::init();

    let twin_port = env_port("TWIN_PORT", 8081);
    let gateway_port = env_port("GATEWAY_PORT", 8082);
    let notification_port = env_port("NOTIFICATION_PORT", 8083);

    let twin_url =
        std::env::var("TWIN_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{twin_port}"));
    let gateway_url =
        std::env::var("GATEWAY_URL").unwrap_or_else(|_| format!("http://127.0.0.1:{gateway_port}"));

    let bus = build_bus();

    let twin = Arc::new(TwinServices::new(
        build_twin_store().await,
        bus.clone(),
        Arc::new(HttpGatewayClient::new(gateway_url)),
    ));
    let gateway = Arc::new(GatewayServices::new(
        Arc::new(MonitoredAccounts::new()),
        bus.clone(),
        Arc::new(HttpTwinClient::new(twin_url)),
    ));
    let notifications = Arc::new(NotificationServices::new(
        Arc::new(InMemoryNotificationStore::new()),
        Arc::new(InMemorySubscriptionStore::new()),
        bus,
    ));
    notifications.clone().spawn_consumer();

    let result = tokio::try_join!(
        serve(app::build_twin_app(twin), twin_port, "account-twin-service"),
        serve(app::build_gateway_app(gateway), gateway_port, "transfer-gateway"),
        serve(
            app::build_notification_app(notifications),
            notification_port,
            "notification-service",
        ),
    );
    if let Err(e) = result {
        tracing::error!(error = %e, "server terminated");
    }
}

fn env_port(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn build_bus() -> SharedBus {
    #[cfg(feature = "redis")]
    if let Ok(url) = std::env::var("REDIS_URL") {
        let bus = piggybank_infra::event_bus::RedisPubSubEventBus::new(&url, "piggybank.*")
            .expect("failed to create redis event bus");
        tracing::info!("using redis pub/sub event bus");
        return SharedBus::new(bus);
    }
    SharedBus::new(InMemoryEventBus::<Envelope>::new())
}

async fn build_twin_store() -> Arc<dyn TwinStore> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        let store = PostgresTwinStore::connect(&database_url)
            .await
            .expect("failed to connect to Postgres");
        tracing::info!("using postgres twin store");
        Arc::new(store)
    } else {
        Arc::new(InMemoryTwinStore::new())
    }
}

async fn serve(app: Router, port: u16, name: &'static str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(service = name, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
