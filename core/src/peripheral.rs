//! Peripheral identity and session lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity and liveness info for one remote peripheral.
///
/// Created when discovery succeeds, dropped when the session reaches
/// `Disconnected`. The UUID is immutable; `last_rssi` is overwritten in
/// place by each sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralHandle {
    /// Peripheral identifier
    pub uuid: Uuid,
    /// Advertised device name
    pub name: String,
    /// Latest known RSSI in dBm
    pub last_rssi: i16,
}

impl fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} dBm)", self.name, self.uuid, self.last_rssi)
    }
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No connection attempt yet
    Idle,
    /// Waiting for the transport to establish the link
    Connecting,
    /// Link up, waiting for the service/characteristic match
    Discovering,
    /// Connected and idle, sends accepted, RSSI sampling runs
    Ready,
    /// A chunked transfer is in flight
    Transferring,
    /// Teardown in progress
    Disconnecting,
    /// Terminal. A new connect attempt creates a new session.
    Disconnected,
}

impl SessionState {
    /// Whether `next` is a legal transition out of this state.
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, Disconnected)
                | (Connecting, Discovering)
                | (Connecting, Disconnecting)
                | (Connecting, Disconnected)
                | (Discovering, Ready)
                | (Discovering, Disconnecting)
                | (Discovering, Disconnected)
                | (Ready, Transferring)
                | (Ready, Disconnecting)
                | (Transferring, Ready)
                | (Transferring, Disconnecting)
                | (Disconnecting, Disconnected)
        )
    }

    /// Whether the session accepts send requests in this state
    pub fn accepts_sends(self) -> bool {
        matches!(self, SessionState::Ready | SessionState::Transferring)
    }

    /// Whether this state is terminal
    pub fn is_terminal(self) -> bool {
        self == SessionState::Disconnected
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::Discovering => write!(f, "Discovering"),
            SessionState::Ready => write!(f, "Ready"),
            SessionState::Transferring => write!(f, "Transferring"),
            SessionState::Disconnecting => write!(f, "Disconnecting"),
            SessionState::Disconnected => write!(f, "Disconnected"),
        }
    }
}
