//! In-process bus

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use crate::{BusError, BusNode, ConnectionStats};

#[derive(Debug, Default)]
struct Shared {
    values: HashMap<String, Vec<u8>>,
    refuse_connect: bool,
    failing_reads: u32,
    connects: u32,
    disconnects: u32,
}

/// Bus whose nodes live in memory
///
/// Clones share nodes and fault settings but each handle has its own
/// connection state and statistics.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    shared: Arc<Mutex<Shared>>,
    connected: bool,
    stats: ConnectionStats,
}

impl MemoryBus {
    /// Empty bus accepting connections
    pub fn new() -> Self {
        Self::default()
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a node without a session (device side)
    pub fn publish(&self, node_id: &str, value: Vec<u8>) {
        self.shared().values.insert(node_id.to_string(), value);
    }

    /// Remove a node's value
    pub fn clear(&self, node_id: &str) {
        self.shared().values.remove(node_id);
    }

    /// Make subsequent `connect` calls fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared().refuse_connect = refuse;
    }

    /// Make the next `n` reads fail with a lost connection
    pub fn fail_next_reads(&self, n: u32) {
        self.shared().failing_reads = n;
    }

    /// Successful connects across all handles
    pub fn connect_count(&self) -> u32 {
        self.shared().connects
    }

    /// Disconnects of open sessions across all handles
    pub fn disconnect_count(&self) -> u32 {
        self.shared().disconnects
    }
}

#[async_trait]
impl BusNode for MemoryBus {
    async fn connect(&mut self) -> Result<(), BusError> {
        let mut shared = self.shared();
        if shared.refuse_connect {
            return Err(BusError::Unreachable("connection refused".into()));
        }
        shared.connects += 1;
        drop(shared);

        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BusError> {
        if self.connected {
            self.shared().disconnects += 1;
            self.connected = false;
        }
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), BusError> {
        self.disconnect().await?;
        self.connect().await?;
        self.stats.reconnections += 1;
        Ok(())
    }

    async fn get_value(&mut self, node_id: &str) -> Result<Option<Vec<u8>>, BusError> {
        if !self.connected {
            let err = BusError::NotConnected;
            self.stats.record_failure(&err);
            return Err(err);
        }

        let mut shared = self.shared();
        if shared.failing_reads > 0 {
            shared.failing_reads -= 1;
            drop(shared);
            let err = BusError::ConnectionLost("injected read failure".into());
            self.stats.record_failure(&err);
            return Err(err);
        }

        let value = shared.values.get(node_id).cloned();
        drop(shared);

        self.stats.record_read(&value);
        Ok(value)
    }

    async fn set_value(&mut self, node_id: &str, value: &[u8]) -> Result<(), BusError> {
        if !self.connected {
            return Err(BusError::NotConnected);
        }
        self.publish(node_id, value.to_vec());
        self.stats.record_write(value.len());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
