//! MQTT-backed bus
//!
//! Each node is a topic. Writers publish with the retain flag so the broker
//! always holds the latest value; a reader subscribes once per node and a
//! background task caches every publish it receives. `get_value` returns the
//! cached latest value.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use crate::{BusError, BusNode, ConnectionStats};

/// Default MQTT port
pub const DEFAULT_PORT: u16 = 1883;

type Retained = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// MQTT session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier, unique per broker
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// How long to wait for the broker's CONNACK
    pub connect_timeout: Duration,
    /// Request channel capacity
    pub capacity: usize,
}

impl MqttConfig {
    /// Parse `mqtt://host:port`, `tcp://host:port`, `host:port` or `host`
    pub fn new(broker_url: &str) -> Result<Self, BusError> {
        let (host, port) = parse_broker_url(broker_url)?;
        Ok(Self {
            host: host.to_string(),
            port,
            client_id: "telemguard".to_string(),
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            capacity: 64,
        })
    }

    /// Set the client identifier
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the keep-alive interval
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options
    }
}

fn parse_broker_url(url: &str) -> Result<(&str, u16), BusError> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.as_slice() {
        [host] if !host.is_empty() => Ok((*host, DEFAULT_PORT)),
        [host, port] if !host.is_empty() => {
            let port = port
                .parse::<u16>()
                .map_err(|_| BusError::Config(format!("Invalid port in broker URL: {}", port)))?;
            Ok((*host, port))
        }
        _ => Err(BusError::Config(format!("Invalid broker URL format: {}", url))),
    }
}

/// Bus node client over an MQTT broker
pub struct MqttBus {
    config: MqttConfig,
    client: Option<AsyncClient>,
    driver: Option<JoinHandle<()>>,
    retained: Retained,
    subscribed: HashSet<String>,
    connected: Arc<AtomicBool>,
    stats: ConnectionStats,
}

impl MqttBus {
    /// Client for `config`; nothing is opened until `connect`
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            driver: None,
            retained: Arc::default(),
            subscribed: HashSet::new(),
            connected: Arc::new(AtomicBool::new(false)),
            stats: ConnectionStats::default(),
        }
    }

    /// Session settings
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    fn client(&self) -> Result<&AsyncClient, BusError> {
        match &self.client {
            Some(client) if self.connected.load(Ordering::Acquire) => Ok(client),
            Some(_) => Err(BusError::ConnectionLost("broker connection dropped".into())),
            None => Err(BusError::NotConnected),
        }
    }

    /// Installs the event-loop task for a new session, aborting any earlier one
    fn install_driver(&mut self, driver: JoinHandle<()>) {
        if let Some(previous) = self.driver.replace(driver) {
            previous.abort();
        }
    }

    async fn read(&mut self, node_id: &str) -> Result<Option<Vec<u8>>, BusError> {
        let client = self.client()?.clone();

        if !self.subscribed.contains(node_id) {
            client
                .subscribe(node_id, QoS::AtLeastOnce)
                .await
                .map_err(|e| BusError::ConnectionLost(e.to_string()))?;
            self.subscribed.insert(node_id.to_string());
            log::debug!("Subscribed to node {}", node_id);
        }

        let retained = self.retained.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(retained.get(node_id).cloned())
    }
}

async fn handshake(eventloop: &mut EventLoop) -> Result<(), BusError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(BusError::Unreachable(format!(
                        "broker refused session: {:?}",
                        code
                    ))),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(BusError::Unreachable(e.to_string())),
        }
    }
}

async fn drive(mut eventloop: EventLoop, retained: Retained, connected: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                retained
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(publish.topic.clone(), publish.payload.to_vec());
            }
            Ok(Event::Incoming(Packet::SubAck(_))) => {
                log::debug!("Subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                log::info!("Broker closed the session");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("MQTT event loop error: {}", e);
                break;
            }
        }
    }
    connected.store(false, Ordering::Release);
}

#[async_trait]
impl BusNode for MqttBus {
    async fn connect(&mut self) -> Result<(), BusError> {
        if self.client.is_some() || self.driver.is_some() {
            if let Err(e) = self.disconnect().await {
                log::debug!("Ignoring disconnect failure before new session: {}", e);
            }
        }

        let (client, mut eventloop) = AsyncClient::new(self.config.options(), self.config.capacity);

        tokio::time::timeout(self.config.connect_timeout, handshake(&mut eventloop))
            .await
            .map_err(|_| BusError::Timeout)??;

        log::info!(
            "Connected to MQTT broker {}:{} as {}",
            self.config.host,
            self.config.port,
            self.config.client_id
        );

        self.connected.store(true, Ordering::Release);
        self.subscribed.clear();
        let driver = tokio::spawn(drive(
            eventloop,
            Arc::clone(&self.retained),
            Arc::clone(&self.connected),
        ));
        self.install_driver(driver);
        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BusError> {
        let result = match self.client.take() {
            Some(client) if self.connected.load(Ordering::Acquire) => client
                .disconnect()
                .await
                .map_err(|e| BusError::ConnectionLost(e.to_string())),
            _ => Ok(()),
        };

        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        self.connected.store(false, Ordering::Release);
        self.subscribed.clear();
        result
    }

    async fn reconnect(&mut self) -> Result<(), BusError> {
        if let Err(e) = self.disconnect().await {
            log::debug!("Ignoring disconnect failure before reconnect: {}", e);
        }
        self.connect().await?;
        self.stats.reconnections += 1;
        Ok(())
    }

    async fn get_value(&mut self, node_id: &str) -> Result<Option<Vec<u8>>, BusError> {
        match self.read(node_id).await {
            Ok(value) => {
                self.stats.record_read(&value);
                Ok(value)
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }

    async fn set_value(&mut self, node_id: &str, value: &[u8]) -> Result<(), BusError> {
        self.client()?
            .publish(node_id, QoS::AtLeastOnce, true, value.to_vec())
            .await
            .map_err(|e| BusError::ConnectionLost(e.to_string()))?;
        self.stats.record_write(value.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}
