//! `telemguard-sensor`: simulated device publishing authenticated readings
//!
//! Samples drift around a mild coastal climate and are either signed with
//! the device's private key or sealed with the shared AES key, then written
//! to the bus node the gateway polls.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use telemguard_auth::{
    keys::{load_private_key, load_symmetric_key},
    AuthMode, ReadingSigner, SymmetricAuthenticator,
};
use telemguard_connectors::{BusNode, MqttBus, MqttConfig};
use telemguard_core::{
    time::{SystemTime, TimeSource},
    SensorReading,
};
use telemguard_gateway::{config::DEFAULT_NODE_ID, init_logging};

#[derive(Debug, Parser)]
#[command(name = "telemguard-sensor", version, about = "Simulated TelemGuard sensor")]
struct SensorConfig {
    /// MQTT broker (`mqtt://host:port`, `host:port` or `host`)
    #[arg(long, env = "TELEMGUARD_BROKER", default_value = "localhost:1883")]
    broker: String,

    /// Bus node to write
    #[arg(long, env = "TELEMGUARD_NODE_ID", default_value = DEFAULT_NODE_ID)]
    node_id: String,

    /// Identifier stamped on every reading
    #[arg(long, env = "TELEMGUARD_SENSOR_ID", default_value_t = 1)]
    sensor_id: i32,

    /// Milliseconds between readings
    #[arg(long, env = "TELEMGUARD_INTERVAL_MS", default_value_t = 5_000)]
    interval_ms: u64,

    /// `signature` or `symmetric`
    #[arg(long, env = "TELEMGUARD_MODE", default_value = "signature")]
    mode: AuthMode,

    /// PEM private key (signature mode)
    #[arg(long, env = "TELEMGUARD_PRIVATE_KEY", default_value = ".keys/sensor_private.pem")]
    private_key: PathBuf,

    /// Raw AES key (symmetric mode)
    #[arg(long, env = "TELEMGUARD_AES_KEY", default_value = ".keys/aes.key")]
    aes_key: PathBuf,

    /// Stop after this many readings (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    count: u64,
}

/// Produces wire frames for the configured mode
enum Sealer {
    Sign(ReadingSigner),
    Encrypt(SymmetricAuthenticator),
}

impl Sealer {
    fn load(config: &SensorConfig) -> Result<Self> {
        Ok(match config.mode {
            AuthMode::Signature => {
                let key = load_private_key(&config.private_key)
                    .with_context(|| format!("cannot load {}", config.private_key.display()))?;
                Self::Sign(ReadingSigner::new(key))
            }
            AuthMode::Symmetric => {
                let key = load_symmetric_key(&config.aes_key)
                    .with_context(|| format!("cannot load {}", config.aes_key.display()))?;
                Self::Encrypt(SymmetricAuthenticator::new(key))
            }
        })
    }

    fn frame(&self, reading: &SensorReading) -> Result<Vec<u8>> {
        Ok(match self {
            Self::Sign(signer) => signer.sign(reading)?,
            Self::Encrypt(sealer) => sealer.seal(reading)?.to_json()?,
        })
    }
}

fn sample(rng: &mut impl Rng, sensor_id: i32, timestamp: u64) -> SensorReading {
    SensorReading::new(
        sensor_id,
        13.5 + rng.gen_range(-2.0f32..2.0),
        1017.0 + rng.gen_range(-5.0f32..5.0),
        (75.0 + rng.gen_range(-10.0..10.0f32)).clamp(0.0, 100.0),
        timestamp,
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = SensorConfig::parse();
    init_logging("info");

    let sealer = Sealer::load(&config)?;
    let client_id = format!("telemguard-sensor-{}", config.sensor_id);
    let mut bus = MqttBus::new(MqttConfig::new(&config.broker)?.with_client_id(client_id));
    bus.connect().await.context("cannot reach the broker")?;
    log::info!(
        "Sensor {} publishing {} frames to '{}' every {} ms",
        config.sensor_id,
        config.mode,
        config.node_id,
        config.interval_ms
    );

    let mut rng = rand::thread_rng();
    let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms.max(1)));
    let mut sent = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {}
        }

        let reading = sample(&mut rng, config.sensor_id, SystemTime.now());
        let frame = sealer.frame(&reading)?;
        match bus.set_value(&config.node_id, &frame).await {
            Ok(()) => {
                sent += 1;
                log::info!(
                    "Published {:.2} °C, {:.2} hPa, {:.1} % ({} bytes)",
                    reading.temperature,
                    reading.pressure,
                    reading.humidity,
                    frame.len()
                );
            }
            Err(e) => log::warn!("Publish failed: {}", e),
        }

        if config.count > 0 && sent >= config.count {
            break;
        }
    }

    bus.disconnect().await?;
    log::info!("Sensor stopped after {} reading(s)", sent);
    Ok(())
}
