//! `telemguard`: collect authenticated readings from the bus until Ctrl-C

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use telemguard_auth::KeyMaterial;
use telemguard_connectors::{MqttBus, MqttConfig};
use telemguard_gateway::{
    init_logging, Collector, Distributor, FileStore, GatewayConfig, MeasurementStore, QueryParams,
    QueryService, SubscriberRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::parse();
    init_logging("info");

    log::info!("Starting telemguard gateway");
    log::debug!("Configuration: {:?}", config);

    let keys = KeyMaterial::load(config.mode, config.key_path())
        .with_context(|| format!("cannot start without {} key material", config.mode))?;

    let store = FileStore::open(&config.store)
        .with_context(|| format!("cannot open measurement store {}", config.store.display()))?;
    let store: Arc<dyn MeasurementStore> = Arc::new(store);

    let registry = Arc::new(SubscriberRegistry::new());
    let distributor = Arc::new(Distributor::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        config.distributor_config(),
    ));
    let query = QueryService::new(Arc::clone(&store), Arc::new(telemguard_core::time::SystemTime));
    let latest = query.latest(1)?;
    log::info!(
        "Store holds {} measurement(s), latest: {:?}",
        store.count()?,
        latest.first().map(|m| m.id)
    );

    let bus_config = MqttConfig::new(&config.broker)?.with_client_id(config.client_id.clone());
    let mut collector = Collector::new(
        MqttBus::new(bus_config),
        keys.authenticator(),
        Arc::clone(&distributor),
        config.collector_config(),
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown requested");
    };
    let result = collector.run(shutdown).await;

    let closed = registry.close_all();
    log::info!("Closed {} subscriber channel(s)", closed);
    log::info!("Distributor: {:?}", distributor.stats());

    let stats = result?;
    log::info!(
        "Collector: {} polls, {} stored, {} duplicates, {} malformed, {} rejected, \
         {} transport errors",
        stats.polls,
        stats.ingested,
        stats.duplicates,
        stats.malformed,
        stats.rejected,
        stats.transport_errors
    );

    let recent = query.query(&QueryParams::default().with_limit(1))?;
    if let Some(last) = recent.first() {
        log::info!("Most recent measurement: {:?}", last);
    }
    Ok(())
}
