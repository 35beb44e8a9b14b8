//! Behaviour every bus node must share, exercised through the trait object

use telemguard_connectors::{BusError, BusNode, MemoryBus};

async fn exercise(bus: &mut dyn BusNode) -> Result<(), BusError> {
    assert!(!bus.is_connected());
    bus.connect().await?;
    assert!(bus.is_connected());

    assert_eq!(bus.get_value("sensor").await?, None);
    bus.set_value("sensor", b"latest").await?;
    bus.set_value("sensor", b"newer").await?;
    assert_eq!(bus.get_value("sensor").await?, Some(b"newer".to_vec()));

    bus.disconnect().await?;
    assert!(!bus.is_connected());
    Ok(())
}

#[tokio::test]
async fn memory_bus_honours_contract() {
    let mut bus = MemoryBus::new();
    exercise(&mut bus).await.unwrap();

    let stats = bus.stats();
    assert_eq!(stats.writes, 2);
    assert_eq!(stats.reads, 1);
    assert_eq!(stats.empty_reads, 1);
}

#[tokio::test]
async fn reconnect_reopens_session() {
    let mut bus: Box<dyn BusNode> = Box::new(MemoryBus::new());
    bus.connect().await.unwrap();
    bus.reconnect().await.unwrap();
    assert!(bus.is_connected());
    assert_eq!(bus.stats().reconnections, 1);
}
