//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use telemguard_core::{time::FixedTime, SensorReading};
use telemguard_gateway::{
    ChannelSink, Distributor, DistributorConfig, MeasurementStore, MemoryStore, QueryService,
    SubscriberRegistry, Subscription,
};
use tokio::sync::mpsc::Receiver;

/// "Now" for every query in these tests (2024-07-08)
pub const NOW: u64 = 1_720_400_000_000;

/// Reading used by the end-to-end scenarios
pub fn scenario_reading() -> SensorReading {
    SensorReading::new(1, 25.5, 1013.25, 65.2, 1_720_328_207_000)
}

/// Same device, different sample
pub fn reading_at(sensor_id: i32, timestamp: u64) -> SensorReading {
    SensorReading::new(sensor_id, 20.0, 1005.0, 50.0, timestamp)
}

/// One key pair per test binary
pub fn rsa_pair() -> (RsaPrivateKey, RsaPublicKey) {
    static PAIR: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();
    PAIR.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    })
    .clone()
}

/// Store, registry, distributor and query service wired together
pub struct Pipeline {
    pub store: Arc<dyn MeasurementStore>,
    pub registry: Arc<SubscriberRegistry>,
    pub distributor: Arc<Distributor>,
    pub query: QueryService,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), 0)
    }

    pub fn with_backlog(backlog: usize) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), backlog)
    }

    pub fn with_store(store: Arc<dyn MeasurementStore>, backlog: usize) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let distributor = Arc::new(Distributor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            DistributorConfig::new().with_backlog(backlog),
        ));
        let query = QueryService::new(Arc::clone(&store), Arc::new(FixedTime::new(NOW)));
        Self {
            store,
            registry,
            distributor,
            query,
        }
    }

    /// Subscribe a fresh bounded channel
    pub fn subscriber(&self) -> (Subscription, Receiver<String>) {
        let (sink, rx) = ChannelSink::new(16);
        let subscription = self.distributor.subscribe(Box::new(sink)).unwrap();
        (subscription, rx)
    }
}

/// Every message waiting on `rx`, parsed
pub fn drain(rx: &mut Receiver<String>) -> Vec<Value> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|text| serde_json::from_str(&text).unwrap())
        .collect()
}
