//! Manager configuration
//!
//! Carries the immutable connection target (service/characteristic UUID
//! pair) plus the caller-facing tunables: RSSI refresh cadence, an
//! optional connect deadline, and the depth of the send backlog.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Default RSSI refresh interval (5 seconds).
pub const DEFAULT_RSSI_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of sends that may queue behind an in-flight transfer.
pub const DEFAULT_SEND_QUEUE_DEPTH: usize = 8;

/// Immutable discovery target: the remote service and the characteristic
/// used for data transfer, both identified by UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// UUID of the target GATT service
    pub service_uuid: Uuid,
    /// UUID of the data characteristic inside that service
    pub characteristic_uuid: Uuid,
}

impl ServiceDescriptor {
    /// Create a new descriptor
    pub fn new(service_uuid: Uuid, characteristic_uuid: Uuid) -> Self {
        Self {
            service_uuid,
            characteristic_uuid,
        }
    }
}

/// Client manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Discovery target supplied at construction
    pub descriptor: ServiceDescriptor,
    /// RSSI refresh interval. Zero disables sampling entirely.
    pub rssi_interval: Duration,
    /// Deadline for connect + discovery. `None` defers entirely to the
    /// transport adapter.
    pub connect_timeout: Option<Duration>,
    /// Maximum sends queued behind an in-flight transfer. Zero means a
    /// send issued while another is in flight is rejected immediately.
    pub send_queue_depth: usize,
}

impl ManagerConfig {
    /// Create a configuration with default tunables for a target pair
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            rssi_interval: DEFAULT_RSSI_INTERVAL,
            connect_timeout: None,
            send_queue_depth: DEFAULT_SEND_QUEUE_DEPTH,
        }
    }

    /// Set the RSSI refresh interval (zero disables sampling)
    pub fn with_rssi_interval(mut self, interval: Duration) -> Self {
        self.rssi_interval = interval;
        self
    }

    /// Set a connect + discovery deadline
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the send backlog depth
    pub fn with_send_queue_depth(mut self, depth: usize) -> Self {
        self.send_queue_depth = depth;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(ClientError::InvalidState(
                "connect timeout must be non-zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
