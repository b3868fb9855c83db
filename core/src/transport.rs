//! Transport adapter seam
//!
//! The platform BLE stack lives behind this trait: connecting, service
//! discovery, characteristic writes, RSSI reads and unsolicited link
//! events. The session owns the adapter exclusively and awaits each call,
//! so an implementation sees at most one outstanding operation at a time.

use crate::config::ServiceDescriptor;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Errors reported by a transport adapter
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("service or characteristic not found: {0}")]
    NotFound(Uuid),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("not connected")]
    NotConnected,
}

/// What the adapter reports about the peripheral it connected to
#[derive(Debug, Clone)]
pub struct PeripheralInfo {
    /// Peripheral identifier
    pub uuid: Uuid,
    /// Advertised device name
    pub name: String,
    /// RSSI observed at connect time, in dBm
    pub rssi: i16,
}

/// Unsolicited events pushed by the adapter after `subscribe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A notification payload arrived on the subscribed characteristic
    Notification(Vec<u8>),
    /// The link was lost without a disconnect request
    LinkLost,
}

/// Platform BLE stack seam.
///
/// Implementations wrap a real central (CoreBluetooth, BlueZ, btleplug,
/// ...) and are free to enforce their own timeouts; the core imposes none
/// unless [`crate::ManagerConfig::connect_timeout`] is set.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Establish a link to the peripheral identified by `target`.
    async fn connect(&self, target: Uuid) -> Result<PeripheralInfo, TransportError>;

    /// Resolve the service/characteristic pair on the connected
    /// peripheral. `Ok` means both were found.
    async fn discover(&self, descriptor: &ServiceDescriptor) -> Result<(), TransportError>;

    /// Write one link-sized chunk to the data characteristic and wait for
    /// the platform's completion.
    async fn write_chunk(&self, chunk: &[u8]) -> Result<(), TransportError>;

    /// Read a fresh RSSI value for the current link.
    async fn read_rssi(&self) -> Result<i16, TransportError>;

    /// Tear the link down. Idempotent; errors are not interesting here.
    async fn disconnect(&self);

    /// Negotiated MTU: the maximum payload of one characteristic write.
    /// Only meaningful after `connect` succeeded.
    fn mtu(&self) -> usize;

    /// Channel of unsolicited link events (notifications, link loss).
    /// Closing the channel is treated as link loss.
    fn subscribe(&self) -> mpsc::Receiver<LinkEvent>;
}
