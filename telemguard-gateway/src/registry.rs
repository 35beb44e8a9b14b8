//! Live subscriber registry
//!
//! Channels are registered under a fresh [`Subscription`] and receive every
//! broadcast until they fail or are unregistered. Registration, removal and
//! broadcast all go through one mutex, so a broadcast sees a consistent set.
//! A send never blocks: a channel that is full or closed is dropped on the
//! spot and the remaining channels still receive the message. Each
//! measurement is encoded to JSON once, before the lock is taken.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use futures::{Stream, StreamExt};
use telemguard_core::PersistedMeasurement;
use thiserror::Error;
use tokio::sync::mpsc;

/// Per-channel delivery failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Peer went away
    #[error("Channel closed")]
    Closed,

    /// Peer is not keeping up
    #[error("Channel full")]
    Full,

    /// Measurement could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// A push connection to one live subscriber
pub trait LiveChannel: Send {
    /// Deliver one JSON-encoded measurement without blocking
    fn send(&mut self, message: &str) -> Result<(), ChannelError>;

    /// Close the connection; further sends fail
    fn close(&mut self);
}

/// Bounded queue carrying one JSON text message per measurement
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<String>>,
}

impl ChannelSink {
    /// Sink and the receiving end for the connection writer
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }
}

impl LiveChannel for ChannelSink {
    fn send(&mut self, message: &str) -> Result<(), ChannelError> {
        let tx = self.tx.as_ref().ok_or(ChannelError::Closed)?;
        tx.try_send(message.to_owned()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChannelError::Full,
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
        })
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

/// The text message live subscribers receive for `measurement`
pub fn encode_measurement(measurement: &PersistedMeasurement) -> Result<String, ChannelError> {
    serde_json::to_string(measurement).map_err(|e| ChannelError::Encode(e.to_string()))
}

/// Unique subscription identifier
pub type SubscriptionId = u64;

/// Handle returned by [`SubscriberRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriptionId,
}

impl Subscription {
    /// Identifier, unique for the registry's lifetime
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Result of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Channels that accepted the message
    pub delivered: usize,
    /// Channels removed because the send failed
    pub dropped: usize,
}

/// Concurrency-safe set of live channels
pub struct SubscriberRegistry {
    channels: Mutex<HashMap<SubscriptionId, Box<dyn LiveChannel>>>,
    id_counter: AtomicU64,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
        }
    }
}

impl SubscriberRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Box<dyn LiveChannel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start delivering broadcasts to `channel`
    pub fn register(&self, channel: Box<dyn LiveChannel>) -> Subscription {
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.channels();
        channels.insert(id, channel);
        log::debug!("Registered subscriber {} ({} live)", id, channels.len());
        Subscription { id }
    }

    /// Stop delivering to the subscription and close its channel
    ///
    /// Returns `false` if it was already gone (dropped or unregistered).
    pub fn unregister(&self, subscription: &Subscription) -> bool {
        let removed = self.channels().remove(&subscription.id);
        match removed {
            Some(mut channel) => {
                channel.close();
                log::debug!("Unregistered subscriber {}", subscription.id);
                true
            }
            None => false,
        }
    }

    /// Whether the subscription is still receiving broadcasts
    pub fn is_registered(&self, subscription: &Subscription) -> bool {
        self.channels().contains_key(&subscription.id)
    }

    /// Deliver to every channel, dropping those that fail
    pub fn broadcast(&self, measurement: &PersistedMeasurement) -> BroadcastReport {
        let message = match encode_measurement(measurement) {
            Ok(message) => message,
            Err(e) => {
                log::error!("Not broadcasting measurement {}: {}", measurement.id, e);
                return BroadcastReport::default();
            }
        };

        let mut channels = self.channels();
        let mut report = BroadcastReport::default();

        channels.retain(|id, channel| match channel.send(&message) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                log::warn!("Dropping subscriber {}: {}", id, e);
                channel.close();
                report.dropped += 1;
                false
            }
        });

        report
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.channels().len()
    }

    /// Whether no channel is registered
    pub fn is_empty(&self) -> bool {
        self.channels().is_empty()
    }

    /// Close and remove every channel (shutdown)
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.channels().drain().collect();
        let count = drained.len();
        for (_, mut channel) in drained {
            channel.close();
        }
        if count > 0 {
            log::info!("Closed {} live subscriber channel(s)", count);
        }
        count
    }
}

/// How a subscriber session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client sent `close`
    CloseRequested,
    /// Inbound stream ended (connection gone)
    StreamEnded,
}

/// Receive loop of one live connection
///
/// Inbound messages are only liveness and close signals. The subscription is
/// removed from the registry when the session ends or is dropped.
pub struct SubscriberSession {
    registry: Arc<SubscriberRegistry>,
    subscription: Subscription,
}

impl SubscriberSession {
    /// Session owning `subscription`
    pub fn new(registry: Arc<SubscriberRegistry>, subscription: Subscription) -> Self {
        Self {
            registry,
            subscription,
        }
    }

    /// The subscription this session owns
    pub fn subscription(&self) -> Subscription {
        self.subscription
    }

    /// Block on inbound messages until `close` or end of stream
    pub async fn run<S>(self, inbound: S) -> SessionEnd
    where
        S: Stream<Item = String> + Unpin,
    {
        let mut inbound = inbound;
        while let Some(message) = inbound.next().await {
            if message.trim() == "close" {
                log::debug!("Subscriber {} requested close", self.subscription.id);
                return SessionEnd::CloseRequested;
            }
            log::debug!(
                "Subscriber {} sent {} bytes, ignored",
                self.subscription.id,
                message.len()
            );
        }
        SessionEnd::StreamEnded
    }
}

impl Drop for SubscriberSession {
    fn drop(&mut self) {
        self.registry.unregister(&self.subscription);
    }
}
