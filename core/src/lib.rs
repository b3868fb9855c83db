//! BLE client session core
//!
//! Drives one connection to a remote BLE peripheral exposing a known
//! service/characteristic pair: connect and discover, split outbound
//! payloads of any length into MTU-sized characteristic writes,
//! reassemble inbound notifications, sample RSSI on a configurable
//! cadence, and report everything to a single registered delegate.
//!
//! The platform BLE stack is an external collaborator behind the
//! [`TransportAdapter`] trait; this crate contains no radio code and no
//! retry policy.
//!
//! # Example
//!
//! ```ignore
//! use btclient_core::{ClientManager, ManagerConfig, ServiceDescriptor};
//!
//! let config = ManagerConfig::new(ServiceDescriptor::new(service_uuid, char_uuid));
//! let manager = ClientManager::new(delegate, adapter, config)?;
//!
//! let peripheral = manager.connect(target_uuid).await?;
//! manager.send_data(payload).await?;          // result via on_send_result
//! manager.set_rssi_refresh_interval(Duration::from_secs(2));
//! manager.disconnect().await;
//! ```

pub mod chunk;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod manager;
pub mod peripheral;
pub mod sampler;
mod session;
pub mod transport;

pub use chunk::{chunk_count, MessageAssembler, OutboundTransfer};
pub use config::{
    ManagerConfig, ServiceDescriptor, DEFAULT_RSSI_INTERVAL, DEFAULT_SEND_QUEUE_DEPTH,
};
pub use error::ClientError;
pub use event::{ClientDelegate, ClientEvent};
pub use logging::init_logging;
pub use manager::ClientManager;
pub use peripheral::{PeripheralHandle, SessionState};
pub use sampler::RssiSampler;
pub use transport::{LinkEvent, PeripheralInfo, TransportAdapter, TransportError};
