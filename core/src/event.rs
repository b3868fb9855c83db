//! Delegate trait and event descriptions
//!
//! One handler per manager instance, no multicast. Callbacks are invoked
//! synchronously from the session task in causal order: a disconnect is
//! never delivered before the connect it follows, and every accepted send
//! produces exactly one result callback.

use crate::peripheral::PeripheralHandle;
use std::fmt;
use uuid::Uuid;

/// Observer for manager lifecycle and data events.
///
/// All methods have no-op defaults so implementors pick only what they
/// need. Implementations must not block: callbacks run on the session
/// task, and blocking there stalls the connection it reports on.
pub trait ClientDelegate: Send + Sync {
    /// The manager became active (construction) or shut down.
    fn on_manager_state_changed(&self, _active: bool) {}

    /// A session reached Ready for the first time.
    fn on_connected(&self, _peripheral: &PeripheralHandle) {}

    /// The session for this peripheral ended, whether requested or not.
    fn on_disconnected(&self, _peripheral: &PeripheralHandle) {}

    /// A fresh RSSI sample was read.
    fn on_rssi_updated(&self, _rssi: i16) {}

    /// Final outcome for one `send_data` call, success or failure,
    /// always for the whole payload.
    fn on_send_result(&self, _payload: &[u8], _success: bool) {}

    /// A complete inbound message was reassembled from notifications.
    fn on_message_received(&self, _payload: &[u8]) {}
}

/// Value form of the delegate callbacks, mainly useful for recording and
/// asserting event order in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    ManagerStateChanged { active: bool },
    Connected { uuid: Uuid },
    Disconnected { uuid: Uuid },
    RssiUpdated { rssi: i16 },
    SendResult { len: usize, success: bool },
    MessageReceived { len: usize },
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::ManagerStateChanged { active } => {
                write!(f, "ManagerStateChanged {{ active: {} }}", active)
            }
            ClientEvent::Connected { uuid } => write!(f, "Connected {{ uuid: {} }}", uuid),
            ClientEvent::Disconnected { uuid } => write!(f, "Disconnected {{ uuid: {} }}", uuid),
            ClientEvent::RssiUpdated { rssi } => write!(f, "RssiUpdated {{ rssi: {} }}", rssi),
            ClientEvent::SendResult { len, success } => {
                write!(f, "SendResult {{ len: {}, success: {} }}", len, success)
            }
            ClientEvent::MessageReceived { len } => {
                write!(f, "MessageReceived {{ len: {} }}", len)
            }
        }
    }
}
