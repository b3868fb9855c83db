//! Client manager facade
//!
//! Owns zero-or-one session at a time. Construction registers the single
//! delegate and the target service/characteristic pair; `connect` spawns
//! a fresh session task (sessions are terminal once disconnected), and
//! the remaining calls forward to it.

use crate::config::ManagerConfig;
use crate::error::ClientError;
use crate::event::ClientDelegate;
use crate::peripheral::PeripheralHandle;
use crate::session::{Command, Session};
use crate::transport::TransportAdapter;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};
use uuid::Uuid;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// BLE client manager: one delegate, one target pair, at most one
/// connected peripheral.
pub struct ClientManager {
    delegate: Arc<dyn ClientDelegate>,
    adapter: Arc<dyn TransportAdapter>,
    config: ManagerConfig,
    /// Interval carried across sessions; changed via
    /// `set_rssi_refresh_interval`. Live sessions watch it, new sessions
    /// read the latest value at spawn.
    rssi_interval: watch::Sender<Duration>,
    current: Arc<RwLock<Option<PeripheralHandle>>>,
    session: Mutex<Option<mpsc::Sender<Command>>>,
    stopped: AtomicBool,
}

impl ClientManager {
    /// Create a manager and report it active to the delegate.
    pub fn new(
        delegate: Arc<dyn ClientDelegate>,
        adapter: Arc<dyn TransportAdapter>,
        config: ManagerConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let (rssi_interval, _) = watch::channel(config.rssi_interval);
        let manager = Self {
            delegate,
            adapter,
            rssi_interval,
            config,
            current: Arc::new(RwLock::new(None)),
            session: Mutex::new(None),
            stopped: AtomicBool::new(false),
        };
        info!(
            "client manager up, target service {}",
            manager.config.descriptor.service_uuid
        );
        manager.delegate.on_manager_state_changed(true);
        Ok(manager)
    }

    /// Connect to the peripheral identified by `target` and wait until
    /// the session is Ready (service and characteristic discovered).
    ///
    /// Fails with `InvalidState` while another session is active. A
    /// failed attempt emits no lifecycle events; the error return is the
    /// single report for it.
    pub async fn connect(&self, target: Uuid) -> Result<PeripheralHandle, ClientError> {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        {
            // The idle check and the slot store happen under one lock
            // acquisition, so two racing connects cannot both pass.
            let mut guard = self.session.lock();
            if let Some(existing) = guard.as_ref() {
                if !existing.is_closed() {
                    return Err(ClientError::InvalidState(
                        "a session is already active".to_string(),
                    ));
                }
            }
            let session = Session::new(
                Arc::clone(&self.adapter),
                Arc::clone(&self.delegate),
                self.config.descriptor,
                self.config.connect_timeout,
                self.config.send_queue_depth,
                self.rssi_interval.subscribe(),
                Arc::clone(&self.current),
            );
            tokio::spawn(session.run(rx));
            *guard = Some(tx.clone());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(Command::Connect {
            target,
            reply: reply_tx,
        })
        .await
        .map_err(|_| ClientError::SessionClosed)?;
        let res = match reply_rx.await {
            Ok(res) => res,
            Err(_) => Err(ClientError::SessionClosed),
        };
        if res.is_err() {
            // Failed sessions are terminal; free the slot right away so
            // the next connect attempt does not race the task exit. Only
            // this attempt's own slot, a successor may already own it.
            let mut guard = self.session.lock();
            if guard.as_ref().is_some_and(|t| t.same_channel(&tx)) {
                *guard = None;
            }
        }
        res
    }

    /// Send a payload of any length to the connected peripheral.
    ///
    /// `Ok` means the send was accepted (started or queued); the outcome
    /// arrives as exactly one `on_send_result` callback per call, also on
    /// every rejection path.
    pub async fn send_data(&self, payload: Vec<u8>) -> Result<(), ClientError> {
        let tx = self.session.lock().clone();
        let Some(tx) = tx else {
            self.delegate.on_send_result(&payload, false);
            return Err(ClientError::InvalidState("not connected".to_string()));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        match tx
            .send(Command::Send {
                payload,
                reply: reply_tx,
            })
            .await
        {
            Ok(()) => match reply_rx.await {
                Ok(res) => res,
                Err(_) => Err(ClientError::SessionClosed),
            },
            Err(mpsc::error::SendError(cmd)) => {
                if let Command::Send { payload, .. } = cmd {
                    self.delegate.on_send_result(&payload, false);
                }
                Err(ClientError::SessionClosed)
            }
        }
    }

    /// Change the RSSI refresh interval, effective immediately. Zero
    /// disables sampling.
    ///
    /// A live session observes the new value on its next loop turn, no
    /// matter how busy its command queue is; without one the value is
    /// kept for the next session.
    pub fn set_rssi_refresh_interval(&self, interval: Duration) {
        debug!("RSSI refresh interval set to {:?}", interval);
        self.rssi_interval.send_replace(interval);
    }

    /// The currently connected peripheral, if any.
    pub fn connected_peripheral(&self) -> Option<PeripheralHandle> {
        self.current.read().clone()
    }

    /// Disconnect the active session, if any, and wait for its teardown.
    /// Any in-flight transfer fails with one result callback.
    pub async fn disconnect(&self) {
        let tx = self.session.lock().take();
        if let Some(tx) = tx {
            let (reply_tx, reply_rx) = oneshot::channel();
            if tx
                .send(Command::Disconnect { reply: reply_tx })
                .await
                .is_ok()
            {
                let _ = reply_rx.await;
            }
        }
    }

    /// Disconnect and report the manager inactive. Idempotent.
    pub async fn shutdown(&self) {
        self.disconnect().await;
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("client manager down");
            self.delegate.on_manager_state_changed(false);
        }
    }
}
