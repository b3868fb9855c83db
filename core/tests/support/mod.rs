//! Shared test doubles: a scriptable transport adapter and a delegate
//! that records every callback for order/count assertions.
#![allow(dead_code)]

use async_trait::async_trait;
use btclient_core::{
    ClientDelegate, ClientEvent, LinkEvent, PeripheralHandle, PeripheralInfo, ServiceDescriptor,
    TransportAdapter, TransportError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Transport adapter with scriptable failures and delays.
pub struct FakeAdapter {
    mtu: usize,
    /// When set, `connect` fails with this message
    pub connect_error: Mutex<Option<String>>,
    /// When set, `connect` sleeps this long before answering
    pub connect_delay: Mutex<Option<Duration>>,
    /// When true, `discover` reports no matching characteristic
    pub discover_error: AtomicBool,
    /// When set, every `write_chunk` sleeps this long before the ack
    pub write_delay: Mutex<Option<Duration>>,
    /// Zero-based write index that fails with a write error
    pub fail_write_at: Mutex<Option<usize>>,
    /// Zero-based write index at which the link drops: the adapter emits
    /// `LinkLost` and the write never completes
    pub drop_link_at_write: Mutex<Option<usize>>,
    /// Successfully acknowledged chunks, in order
    pub writes: Mutex<Vec<Vec<u8>>>,
    /// Set once `disconnect` was called
    pub disconnected: AtomicBool,
    write_count: AtomicUsize,
    rssi_count: AtomicUsize,
    link_tx: Mutex<Option<mpsc::Sender<LinkEvent>>>,
}

impl FakeAdapter {
    pub fn new(mtu: usize) -> Self {
        Self {
            mtu,
            connect_error: Mutex::new(None),
            connect_delay: Mutex::new(None),
            discover_error: AtomicBool::new(false),
            write_delay: Mutex::new(None),
            fail_write_at: Mutex::new(None),
            drop_link_at_write: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            write_count: AtomicUsize::new(0),
            rssi_count: AtomicUsize::new(0),
            link_tx: Mutex::new(None),
        }
    }

    /// Push an unsolicited link event to the subscribed session.
    pub async fn emit(&self, event: LinkEvent) {
        let tx = self.link_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// Total `write_chunk` calls, including failed and hung ones.
    pub fn write_attempts(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Concatenation of all acknowledged chunks.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes.lock().iter().flatten().copied().collect()
    }
}

#[async_trait]
impl TransportAdapter for FakeAdapter {
    async fn connect(&self, target: Uuid) -> Result<PeripheralInfo, TransportError> {
        let delay = *self.connect_delay.lock();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(msg) = self.connect_error.lock().clone() {
            return Err(TransportError::ConnectFailed(msg));
        }
        Ok(PeripheralInfo {
            uuid: target,
            name: "fake-peripheral".to_string(),
            rssi: -50,
        })
    }

    async fn discover(&self, descriptor: &ServiceDescriptor) -> Result<(), TransportError> {
        if self.discover_error.load(Ordering::SeqCst) {
            return Err(TransportError::NotFound(descriptor.characteristic_uuid));
        }
        Ok(())
    }

    async fn write_chunk(&self, chunk: &[u8]) -> Result<(), TransportError> {
        let index = self.write_count.fetch_add(1, Ordering::SeqCst);
        if *self.drop_link_at_write.lock() == Some(index) {
            self.emit(LinkEvent::LinkLost).await;
            futures::future::pending::<()>().await;
        }
        let delay = *self.write_delay.lock();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if *self.fail_write_at.lock() == Some(index) {
            return Err(TransportError::WriteFailed("injected failure".to_string()));
        }
        self.writes.lock().push(chunk.to_vec());
        Ok(())
    }

    async fn read_rssi(&self) -> Result<i16, TransportError> {
        let n = self.rssi_count.fetch_add(1, Ordering::SeqCst) as i16;
        Ok(-41 - n)
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn subscribe(&self) -> mpsc::Receiver<LinkEvent> {
        let (tx, rx) = mpsc::channel(16);
        *self.link_tx.lock() = Some(tx);
        rx
    }
}

/// Delegate that records every callback as a [`ClientEvent`].
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<ClientEvent>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    /// `(payload_len, success)` per send result, in delivery order.
    pub fn send_results(&self) -> Vec<(usize, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::SendResult { len, success } => Some((len, success)),
                _ => None,
            })
            .collect()
    }

    pub fn rssi_updates(&self) -> Vec<i16> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::RssiUpdated { rssi } => Some(rssi),
                _ => None,
            })
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ClientEvent::Connected { .. }))
            .count()
    }

    pub fn disconnected_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ClientEvent::Disconnected { .. }))
            .count()
    }

    pub fn manager_states(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::ManagerStateChanged { active } => Some(active),
                _ => None,
            })
            .collect()
    }

    pub fn received_messages(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::MessageReceived { len } => Some(len),
                _ => None,
            })
            .collect()
    }
}

impl ClientDelegate for RecordingDelegate {
    fn on_manager_state_changed(&self, active: bool) {
        self.events
            .lock()
            .push(ClientEvent::ManagerStateChanged { active });
    }

    fn on_connected(&self, peripheral: &PeripheralHandle) {
        self.events.lock().push(ClientEvent::Connected {
            uuid: peripheral.uuid,
        });
    }

    fn on_disconnected(&self, peripheral: &PeripheralHandle) {
        self.events.lock().push(ClientEvent::Disconnected {
            uuid: peripheral.uuid,
        });
    }

    fn on_rssi_updated(&self, rssi: i16) {
        self.events.lock().push(ClientEvent::RssiUpdated { rssi });
    }

    fn on_send_result(&self, payload: &[u8], success: bool) {
        self.events.lock().push(ClientEvent::SendResult {
            len: payload.len(),
            success,
        });
    }

    fn on_message_received(&self, payload: &[u8]) {
        self.events.lock().push(ClientEvent::MessageReceived {
            len: payload.len(),
        });
    }
}

/// Poll `cond` while letting the (paused) runtime advance virtual time.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within virtual 10s");
}
