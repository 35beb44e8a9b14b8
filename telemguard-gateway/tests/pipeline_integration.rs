//! End-to-end flows through collector, distributor, registry and queries

mod common;

use std::{sync::Arc, thread, time::Duration};

use telemguard_auth::{
    Authenticator, KeyMaterial, ReadingSigner, SignatureAuthenticator, SymmetricKey,
};
use telemguard_connectors::{BusNode, MemoryBus};
use telemguard_core::{decode_envelope, FrameError, PersistedMeasurement};
use telemguard_gateway::{
    ChannelSink, Collector, CollectorConfig, CollectorState, ErrorKind, FileStore, IngestAck,
    IngestError, IngestionService, PollOutcome, QueryParams, SessionEnd, SubscriberSession,
};

use common::{drain, reading_at, rsa_pair, scenario_reading, Pipeline};

const SCENARIO_JSON: &str =
    r#"{"sensor_id":1,"temperature":25.5,"pressure":1013.25,"humidity":65.2,"timestamp":1720328207000}"#;

fn signed_collector(pipeline: &Pipeline, bus: MemoryBus) -> (Collector<MemoryBus>, ReadingSigner) {
    let (private, public) = rsa_pair();
    let authenticator: Arc<dyn Authenticator> = Arc::new(SignatureAuthenticator::new(public));
    let collector = Collector::new(
        bus,
        authenticator,
        Arc::clone(&pipeline.distributor),
        CollectorConfig::default(),
    );
    (collector, ReadingSigner::new(private))
}

#[test]
fn submitted_reading_is_queryable() {
    let pipeline = Pipeline::new();
    let ingest = IngestionService::plain(Arc::clone(&pipeline.distributor));

    assert_eq!(ingest.handle(SCENARIO_JSON.as_bytes()), Ok(IngestAck { id: 1 }));

    let rows = pipeline
        .query
        .query(&QueryParams::range(1_720_328_000_000, 1_720_329_000_000).with_sensor(1))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].reading, scenario_reading());
}

#[test]
fn implausible_humidity_is_rejected_without_side_effects() {
    let pipeline = Pipeline::new();
    let (_subscription, mut rx) = pipeline.subscriber();
    let ingest = IngestionService::plain(Arc::clone(&pipeline.distributor));

    let err = ingest
        .handle(br#"{"sensor_id":1,"temperature":25.5,"pressure":1013.25,"humidity":150,"timestamp":1720328207000}"#)
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ValidationError);
    assert_eq!(pipeline.store.count().unwrap(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn both_subscribers_receive_the_broadcast() {
    let pipeline = Pipeline::new();
    let (_a, mut rx_a) = pipeline.subscriber();
    let (_b, mut rx_b) = pipeline.subscriber();

    let stored = pipeline.distributor.ingest(scenario_reading()).unwrap();

    for rx in [&mut rx_a, &mut rx_b] {
        let messages = drain(rx);
        assert_eq!(messages.len(), 1);
        let received: PersistedMeasurement = serde_json::from_value(messages[0].clone()).unwrap();
        assert_eq!(received.id, stored.id);
        assert_eq!(received.reading, stored.reading);
    }
}

#[test]
fn departed_subscriber_does_not_block_the_other() {
    let pipeline = Pipeline::new();
    let (gone, rx_gone) = pipeline.subscriber();
    let (alive, mut rx_alive) = pipeline.subscriber();
    drop(rx_gone);

    pipeline.distributor.ingest(scenario_reading()).unwrap();

    assert_eq!(drain(&mut rx_alive).len(), 1);
    assert!(!pipeline.registry.is_registered(&gone));
    assert!(pipeline.registry.is_registered(&alive));

    let stats = pipeline.distributor.stats();
    assert_eq!(stats.broadcasts_delivered, 1);
    assert_eq!(stats.subscribers_dropped, 1);
}

#[test]
fn twenty_byte_frame_is_malformed() {
    let frame = [0x5A; 20];
    assert!(matches!(
        decode_envelope(&frame),
        Err(FrameError::TooShort { actual: 20, .. })
    ));

    let (_, public) = rsa_pair();
    let err = SignatureAuthenticator::new(public).authenticate(&frame).unwrap_err();
    assert_eq!(ErrorKind::from(&err), ErrorKind::MalformedFrame);
}

#[test]
fn concurrent_ingests_get_distinct_increasing_ids() {
    let pipeline = Pipeline::new();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let distributor = Arc::clone(&pipeline.distributor);
            thread::spawn(move || {
                let mut ids = Vec::new();
                for i in 0..25u64 {
                    let mut reading = reading_at(worker, 1_000 + i);
                    if i % 5 == 0 {
                        reading.humidity = 101.0;
                    }
                    match distributor.ingest(reading) {
                        Ok(m) => ids.push(m.id),
                        Err(IngestError::Validation(_)) => {}
                        Err(e) => panic!("unexpected failure: {e}"),
                    }
                }
                ids
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=160).collect::<Vec<_>>());

    let stored: Vec<u64> = pipeline.store.latest(200).unwrap().iter().rev().map(|m| m.id).collect();
    assert!(stored.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(pipeline.distributor.stats().rejected, 40);
}

#[test]
fn concurrent_ingests_reach_subscribers_in_id_order() {
    let pipeline = Pipeline::new();
    let (sink, mut rx) = ChannelSink::new(256);
    pipeline.distributor.subscribe(Box::new(sink)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let distributor = Arc::clone(&pipeline.distributor);
            thread::spawn(move || {
                for i in 0..50u64 {
                    distributor.ingest(reading_at(worker, i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let ids: Vec<u64> = drain(&mut rx).iter().map(|m| m["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, (1..=200).collect::<Vec<_>>());
}

#[test]
fn query_orders_newest_first_and_limits() {
    let pipeline = Pipeline::new();
    for (sensor, ts) in [(1, 3_000), (2, 1_000), (1, 2_000), (1, 3_000)] {
        pipeline.distributor.ingest(reading_at(sensor, ts)).unwrap();
    }

    let ids: Vec<u64> = pipeline
        .query
        .query(&QueryParams::default())
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![4, 1, 3, 2]);

    let limited = pipeline
        .query
        .query(&QueryParams::default().with_sensor(1).with_limit(2))
        .unwrap();
    assert_eq!(limited.iter().map(|m| m.id).collect::<Vec<_>>(), vec![4, 1]);

    assert_eq!(pipeline.query.get(99).unwrap_err().kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn signed_frames_flow_from_bus_to_subscribers() {
    let pipeline = Pipeline::new();
    let (_subscription, mut rx) = pipeline.subscriber();
    let bus = MemoryBus::new();
    let (mut collector, signer) = signed_collector(&pipeline, bus.clone());
    collector.connect().await.unwrap();

    bus.publish("sensor", signer.sign(&scenario_reading()).unwrap());
    assert_eq!(collector.poll_once().await, PollOutcome::Ingested(1));
    assert_eq!(collector.poll_once().await, PollOutcome::Unchanged);

    let messages = drain(&mut rx);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sensor_id"], 1);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let pipeline = Pipeline::new();
    let bus = MemoryBus::new();
    let (mut collector, signer) = signed_collector(&pipeline, bus.clone());
    collector.connect().await.unwrap();

    let mut frame = signer.sign(&scenario_reading()).unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0x01;
    bus.publish("sensor", frame);

    assert_eq!(
        collector.poll_once().await,
        PollOutcome::Rejected(ErrorKind::AuthenticationFailed)
    );
    assert_eq!(pipeline.store.count().unwrap(), 0);
    assert_eq!(collector.stats().rejected, 1);
}

#[tokio::test]
async fn sealed_frames_are_collected_in_symmetric_mode() {
    let pipeline = Pipeline::new();
    let bus = MemoryBus::new();
    let keys = KeyMaterial::Symmetric(SymmetricKey::generate());
    let key = keys.symmetric_key().unwrap().clone();
    let sealer = telemguard_auth::SymmetricAuthenticator::new(key);

    let mut collector = Collector::new(
        bus.clone(),
        keys.authenticator(),
        Arc::clone(&pipeline.distributor),
        CollectorConfig::default(),
    );
    collector.connect().await.unwrap();

    let envelope = sealer.seal(&scenario_reading()).unwrap();
    bus.publish("sensor", envelope.to_json().unwrap());
    assert_eq!(collector.poll_once().await, PollOutcome::Ingested(1));

    bus.publish("sensor", bare_reading_frame());
    assert_eq!(
        collector.poll_once().await,
        PollOutcome::Rejected(ErrorKind::MalformedFrame)
    );
}

fn bare_reading_frame() -> Vec<u8> {
    telemguard_core::encode_reading(&scenario_reading()).to_vec()
}

#[tokio::test(start_paused = true)]
async fn run_polls_until_shutdown_and_releases_bus() {
    let pipeline = Pipeline::new();
    let bus = MemoryBus::new();
    let (mut collector, signer) = signed_collector(&pipeline, bus.clone());
    bus.publish("sensor", signer.sign(&scenario_reading()).unwrap());

    let stats = collector
        .run(tokio::time::sleep(Duration::from_millis(1_750)))
        .await
        .unwrap();

    assert_eq!(stats.ingested, 1);
    assert!(stats.polls >= 3);
    assert_eq!(stats.duplicates, stats.polls - 1);
    assert_eq!(bus.connect_count(), 1);
    assert_eq!(bus.disconnect_count(), 1);
    assert_eq!(collector.state(), CollectorState::Disconnected);
    assert!(!collector.bus().is_connected());
}

#[tokio::test(start_paused = true)]
async fn transport_failures_back_off_and_reconnect() {
    let pipeline = Pipeline::new();
    let bus = MemoryBus::new();
    let (mut collector, signer) = signed_collector(&pipeline, bus.clone());
    bus.publish("sensor", signer.sign(&scenario_reading()).unwrap());
    bus.fail_next_reads(2);

    let stats = collector
        .run(tokio::time::sleep(Duration::from_secs(10)))
        .await
        .unwrap();

    assert_eq!(stats.transport_errors, 2);
    assert_eq!(stats.ingested, 1);
    assert_eq!(collector.bus().stats().reconnections, 2);
}

#[tokio::test]
async fn refused_initial_connect_ends_the_run() {
    let pipeline = Pipeline::new();
    let bus = MemoryBus::new();
    bus.refuse_connections(true);
    let (mut collector, _) = signed_collector(&pipeline, bus.clone());

    assert!(collector.run(std::future::pending()).await.is_err());
    assert_eq!(bus.disconnect_count(), 0);
}

#[tokio::test]
async fn session_close_unregisters_subscriber() {
    let pipeline = Pipeline::with_backlog(5);
    pipeline.distributor.ingest(reading_at(1, 1_000)).unwrap();
    pipeline.distributor.ingest(reading_at(1, 2_000)).unwrap();

    let (subscription, mut rx) = pipeline.subscriber();
    let backlog = drain(&mut rx);
    assert_eq!(backlog.iter().map(|m| m["id"].as_u64().unwrap()).collect::<Vec<_>>(), vec![1, 2]);

    let session = SubscriberSession::new(Arc::clone(&pipeline.registry), subscription);
    let inbound = futures::stream::iter(vec!["keepalive".to_string(), "close".to_string()]);
    assert_eq!(session.run(inbound).await, SessionEnd::CloseRequested);

    assert!(pipeline.registry.is_empty());
    pipeline.distributor.ingest(reading_at(1, 3_000)).unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor.jsonl");

    {
        let pipeline = Pipeline::with_store(Arc::new(FileStore::open(&path).unwrap()), 0);
        pipeline.distributor.ingest(reading_at(1, 1_000)).unwrap();
        pipeline.distributor.ingest(reading_at(2, 2_000)).unwrap();
    }

    let pipeline = Pipeline::with_store(Arc::new(FileStore::open(&path).unwrap()), 0);
    assert_eq!(pipeline.distributor.ingest(reading_at(1, 3_000)).unwrap().id, 3);

    let rows = pipeline.query.query(&QueryParams::default().with_sensor(1)).unwrap();
    assert_eq!(rows.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3, 1]);
}
