use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyhold_api::{app, worker, AppState};
use skyhold_core::clock::SystemClock;
use skyhold_core::repository::InventoryStore;
use skyhold_inventory::{BroadcastPublisher, FanoutPublisher, InventoryEngine, MemoryStore};
use skyhold_store::app_config::{Config, StorageBackend};
use skyhold_store::{KafkaEventPublisher, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "skyhold_api=debug,skyhold_inventory=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyhold inventory on port {}", config.server.port);

    let store: Arc<dyn InventoryStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = PgStore::connect(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(db)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let events = BroadcastPublisher::new(1024);
    let mut publisher = FanoutPublisher::new().with(Arc::new(events.clone()));
    if config.kafka.enabled {
        let kafka = KafkaEventPublisher::new(&config.kafka.brokers).context("Failed to create Kafka producer")?;
        publisher = publisher.with(Arc::new(kafka));
    }

    let engine = Arc::new(InventoryEngine::new(
        store,
        Arc::new(publisher),
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    worker::start_sweepers(engine.clone(), &config.engine);
    if config.kafka.enabled {
        tokio::spawn(worker::start_booking_worker(engine.clone(), config.kafka.clone()));
    }

    let app = app(AppState { engine, events });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
