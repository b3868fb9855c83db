//! Session state machine
//!
//! One tokio task per session owns the transport adapter exclusively and
//! drives connect → discover → ready → transfer → disconnect. Commands
//! arrive over an mpsc channel; unsolicited link events arrive over the
//! adapter's subscription channel; delegate callbacks go out synchronously
//! from this task, which keeps them in causal order.
//!
//! At most one adapter operation is outstanding at any time: chunk writes
//! are awaited one by one, and the RSSI tick branch is gated off outside
//! Ready, so a transfer never interleaves with an RSSI read.

use crate::chunk::{MessageAssembler, OutboundTransfer};
use crate::config::ServiceDescriptor;
use crate::error::ClientError;
use crate::event::ClientDelegate;
use crate::peripheral::{PeripheralHandle, SessionState};
use crate::sampler::RssiSampler;
use crate::transport::{LinkEvent, TransportAdapter, TransportError};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Commands from the manager facade to the session task
pub(crate) enum Command {
    Connect {
        target: Uuid,
        reply: oneshot::Sender<Result<PeripheralHandle, ClientError>>,
    },
    Send {
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// One connection lifecycle. Terminal once Disconnected; the manager
/// spawns a fresh session for every connect attempt.
pub(crate) struct Session {
    adapter: Arc<dyn TransportAdapter>,
    delegate: Arc<dyn ClientDelegate>,
    descriptor: ServiceDescriptor,
    connect_timeout: Option<Duration>,
    queue_depth: usize,

    state: SessionState,
    peripheral: Option<PeripheralHandle>,
    /// Slot shared with the facade for `connected_peripheral`
    current: Arc<RwLock<Option<PeripheralHandle>>>,

    sampler: RssiSampler,
    /// Retune channel from the facade; the latest value always wins
    interval_rx: watch::Receiver<Duration>,
    reschedule: bool,

    mtu: usize,
    assembler: MessageAssembler,
    active: Option<OutboundTransfer>,
    backlog: VecDeque<Vec<u8>>,
    in_flight: Option<BoxFuture<'static, Result<(), TransportError>>>,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        adapter: Arc<dyn TransportAdapter>,
        delegate: Arc<dyn ClientDelegate>,
        descriptor: ServiceDescriptor,
        connect_timeout: Option<Duration>,
        queue_depth: usize,
        interval_rx: watch::Receiver<Duration>,
        current: Arc<RwLock<Option<PeripheralHandle>>>,
    ) -> Self {
        let sampler = RssiSampler::new(*interval_rx.borrow());
        Self {
            adapter,
            delegate,
            descriptor,
            connect_timeout,
            queue_depth,
            state: SessionState::Idle,
            peripheral: None,
            current,
            sampler,
            interval_rx,
            reschedule: false,
            mtu: 0,
            assembler: MessageAssembler::default(),
            active: None,
            backlog: VecDeque::new(),
            in_flight: None,
        }
    }

    /// Actor loop. Exits when the session reaches Disconnected or the
    /// manager drops its command channel.
    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut link_rx = self.adapter.subscribe();
        let mut ticker = make_ticker(self.sampler.interval());
        let mut interval_rx = self.interval_rx.clone();
        // Stops watching once the facade is gone
        let mut retune_open = true;

        loop {
            if self.reschedule {
                ticker = make_ticker(self.sampler.interval());
                self.reschedule = false;
            }
            if self.state.is_terminal() {
                break;
            }

            if let Some(mut write) = self.in_flight.take() {
                // A chunk write is pending. Keep polling commands and link
                // events so a disconnect or link loss is not stuck behind
                // the transfer; the write future survives those arms.
                tokio::select! {
                    biased;
                    cmd = rx.recv() => match cmd {
                        Some(Command::Disconnect { reply }) => {
                            self.finish(true).await;
                            let _ = reply.send(());
                        }
                        Some(cmd) => {
                            self.handle_command(cmd).await;
                            self.in_flight = Some(write);
                        }
                        None => self.finish(true).await,
                    },
                    ev = link_rx.recv() => match ev {
                        Some(LinkEvent::Notification(data)) => {
                            self.handle_notification(&data);
                            self.in_flight = Some(write);
                        }
                        Some(LinkEvent::LinkLost) | None => self.finish(false).await,
                    },
                    changed = interval_rx.changed(), if retune_open => {
                        self.apply_retune(&interval_rx, changed, &mut retune_open);
                        self.in_flight = Some(write);
                    }
                    res = &mut write => self.on_chunk_result(res),
                }
            } else {
                tokio::select! {
                    biased;
                    cmd = rx.recv() => match cmd {
                        Some(Command::Disconnect { reply }) => {
                            self.finish(true).await;
                            let _ = reply.send(());
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => self.finish(true).await,
                    },
                    ev = link_rx.recv() => match ev {
                        Some(LinkEvent::Notification(data)) => self.handle_notification(&data),
                        Some(LinkEvent::LinkLost) | None => self.finish(false).await,
                    },
                    changed = interval_rx.changed(), if retune_open => {
                        self.apply_retune(&interval_rx, changed, &mut retune_open);
                    }
                    _ = ticker.tick(), if self.sampler.active() => self.sample_rssi().await,
                }
            }
        }

        // Reject anything that raced the teardown so every send still
        // gets its one result callback.
        rx.close();
        while let Ok(cmd) = rx.try_recv() {
            self.reject_command(cmd);
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { target, reply } => {
                let res = self.establish(target).await;
                let _ = reply.send(res);
            }
            Command::Send { payload, reply } => {
                let res = self.accept_send(payload);
                let _ = reply.send(res);
            }
            Command::Disconnect { reply } => {
                self.finish(true).await;
                let _ = reply.send(());
            }
        }
    }

    /// Pick up an interval change pushed by the facade. `changed()` marks
    /// the value seen, so `borrow` reads the newest one even after a burst
    /// of retunes.
    fn apply_retune(
        &mut self,
        interval_rx: &watch::Receiver<Duration>,
        changed: Result<(), watch::error::RecvError>,
        retune_open: &mut bool,
    ) {
        match changed {
            Ok(()) => {
                let interval = *interval_rx.borrow();
                debug!("RSSI refresh interval now {:?}", interval);
                if self.sampler.set_interval(interval) {
                    self.reschedule = true;
                }
            }
            Err(_) => *retune_open = false,
        }
    }

    fn reject_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { reply, .. } => {
                let _ = reply.send(Err(ClientError::SessionClosed));
            }
            Command::Send { payload, reply } => {
                self.delegate.on_send_result(&payload, false);
                let _ = reply.send(Err(ClientError::SessionClosed));
            }
            Command::Disconnect { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Connect and discover, then enter Ready. Emits `on_connected`
    /// exactly once on success and nothing on failure; the failure goes
    /// back to the caller of `connect`.
    async fn establish(&mut self, target: Uuid) -> Result<PeripheralHandle, ClientError> {
        if self.state != SessionState::Idle {
            return Err(ClientError::InvalidState(format!(
                "connect while {}",
                self.state
            )));
        }

        self.set_state(SessionState::Connecting);
        info!("connecting to {}", target);

        let res = match self.connect_timeout {
            Some(limit) => match time::timeout(limit, self.connect_and_discover(target)).await {
                Ok(res) => res,
                Err(_) => Err(ClientError::ConnectFailed(format!(
                    "timed out after {:?}",
                    limit
                ))),
            },
            None => self.connect_and_discover(target).await,
        };

        match res {
            Ok(handle) => {
                self.mtu = self.adapter.mtu();
                self.assembler = MessageAssembler::new(self.mtu);
                self.peripheral = Some(handle.clone());
                *self.current.write() = Some(handle.clone());
                self.set_state(SessionState::Ready);
                self.sampler.resume();
                self.reschedule = true;
                info!("connected to {} (MTU {})", handle, self.mtu);
                self.delegate.on_connected(&handle);
                Ok(handle)
            }
            Err(e) => {
                warn!("connect to {} failed: {}", target, e);
                self.adapter.disconnect().await;
                self.set_state(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn connect_and_discover(
        &mut self,
        target: Uuid,
    ) -> Result<PeripheralHandle, ClientError> {
        let info = self
            .adapter
            .connect(target)
            .await
            .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;

        self.set_state(SessionState::Discovering);
        self.adapter
            .discover(&self.descriptor)
            .await
            .map_err(|e| ClientError::DiscoveryFailed(e.to_string()))?;

        Ok(PeripheralHandle {
            uuid: info.uuid,
            name: info.name,
            last_rssi: info.rssi,
        })
    }

    /// Admission control for `send_data`. Outside Ready/Transferring the
    /// send fails immediately instead of queueing silently, and every
    /// rejection still produces its one failure callback.
    fn accept_send(&mut self, payload: Vec<u8>) -> Result<(), ClientError> {
        match self.state {
            SessionState::Ready => {
                if payload.is_empty() {
                    // Zero chunks, immediate success
                    self.delegate.on_send_result(&payload, true);
                    return Ok(());
                }
                if self.mtu == 0 {
                    self.delegate.on_send_result(&payload, false);
                    return Err(ClientError::WriteFailed(
                        "adapter reported a zero MTU".to_string(),
                    ));
                }
                debug!(
                    "starting transfer of {} bytes in {} chunks",
                    payload.len(),
                    crate::chunk::chunk_count(payload.len(), self.mtu)
                );
                self.set_state(SessionState::Transferring);
                self.sampler.pause();
                self.active = Some(OutboundTransfer::new(payload));
                self.in_flight = self.next_write();
                Ok(())
            }
            SessionState::Transferring => {
                if self.backlog.len() >= self.queue_depth {
                    self.delegate.on_send_result(&payload, false);
                    Err(ClientError::QueueFull)
                } else {
                    self.backlog.push_back(payload);
                    Ok(())
                }
            }
            other => {
                self.delegate.on_send_result(&payload, false);
                Err(ClientError::InvalidState(format!("send while {}", other)))
            }
        }
    }

    /// Box the next chunk write so the run loop can keep it pending
    /// across other select arms.
    fn next_write(&mut self) -> Option<BoxFuture<'static, Result<(), TransportError>>> {
        let transfer = self.active.as_ref()?;
        let chunk = transfer.next_chunk(self.mtu)?.to_vec();
        let adapter = Arc::clone(&self.adapter);
        Some(Box::pin(async move { adapter.write_chunk(&chunk).await }))
    }

    fn on_chunk_result(&mut self, res: Result<(), TransportError>) {
        match res {
            Ok(()) => {
                if let Some(transfer) = self.active.as_mut() {
                    transfer.advance(self.mtu);
                }
                let complete = self
                    .active
                    .as_ref()
                    .map(|t| t.is_complete())
                    .unwrap_or(true);
                if complete {
                    if let Some(transfer) = self.active.take() {
                        debug!("transfer of {} bytes complete", transfer.payload().len());
                        self.delegate.on_send_result(transfer.payload(), true);
                    }
                    self.next_transfer();
                } else {
                    self.in_flight = self.next_write();
                }
            }
            Err(e) => {
                // One chunk failure fails the whole payload, never a part
                warn!("chunk write failed, aborting transfer: {}", e);
                if let Some(transfer) = self.active.take() {
                    self.delegate.on_send_result(transfer.payload(), false);
                }
                self.next_transfer();
            }
        }
    }

    /// Pop the next queued send, or fall back to Ready and resume the
    /// RSSI schedule from now.
    fn next_transfer(&mut self) {
        while let Some(payload) = self.backlog.pop_front() {
            if payload.is_empty() {
                self.delegate.on_send_result(&payload, true);
                continue;
            }
            self.active = Some(OutboundTransfer::new(payload));
            self.in_flight = self.next_write();
            return;
        }
        self.set_state(SessionState::Ready);
        self.sampler.resume();
        self.reschedule = true;
    }

    async fn sample_rssi(&mut self) {
        match self.adapter.read_rssi().await {
            Ok(rssi) => {
                if let Some(handle) = self.peripheral.as_mut() {
                    handle.last_rssi = rssi;
                }
                if let Some(handle) = self.current.write().as_mut() {
                    handle.last_rssi = rssi;
                }
                self.delegate.on_rssi_updated(rssi);
            }
            Err(e) => warn!("RSSI read failed: {}", e),
        }
    }

    fn handle_notification(&mut self, data: &[u8]) {
        if !self.state.accepts_sends() {
            debug!("dropping {}-byte notification in {}", data.len(), self.state);
            return;
        }
        if let Some(message) = self.assembler.push(data) {
            debug!("reassembled {}-byte inbound message", message.len());
            self.delegate.on_message_received(&message);
        }
    }

    /// Tear the session down: fail the in-flight transfer and the whole
    /// backlog (one callback each), disconnect the adapter, and emit
    /// `on_disconnected` once if a connect had been reported.
    async fn finish(&mut self, requested: bool) {
        if self.state.is_terminal() {
            return;
        }
        if requested {
            info!("session closing");
        } else {
            warn!("link lost");
        }

        self.in_flight = None;
        if let Some(transfer) = self.active.take() {
            self.delegate.on_send_result(transfer.payload(), false);
        }
        while let Some(payload) = self.backlog.pop_front() {
            self.delegate.on_send_result(&payload, false);
        }
        self.sampler.pause();
        self.assembler.reset();

        if self.state != SessionState::Idle {
            self.set_state(SessionState::Disconnecting);
            self.adapter.disconnect().await;
        }
        self.set_state(SessionState::Disconnected);

        self.current.write().take();
        if let Some(handle) = self.peripheral.take() {
            self.delegate.on_disconnected(&handle);
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition(next) {
            warn!("illegal transition {} -> {}", self.state, next);
        }
        debug!("session state {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Build the RSSI tick timer. The first tick fires one full interval
/// from now, and missed ticks are delayed rather than bursted, so a
/// pause never produces retroactive samples.
fn make_ticker(interval: Duration) -> time::Interval {
    let period = if interval.is_zero() {
        // Never polled while disabled; any non-zero period will do
        Duration::from_secs(3600)
    } else {
        interval
    };
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
