// src/io/serial/manager.rs
//
// Foreground handle for the serial connection manager.
// Sends fire-and-forget requests to the background worker and is the only
// writer of the published state. Updates from the worker are applied when
// the owner drains them, then broadcast to subscribers.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::line_config::LineConfig;
use super::worker::{Command, ManagerUpdate, Worker};
use crate::io::error::SerialError;
use crate::io::types::{ConnectionState, InboundEvent, LineEnding, PortIdentifier};
use crate::settings::ManagerSettings;

// ============================================================================
// Published State
// ============================================================================

/// Everything an observer can see about the manager.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagerSnapshot {
    pub state: ConnectionState,
    pub available_ports: Vec<PortIdentifier>,
    /// `available_ports` is the demo placeholder list
    pub ports_are_placeholder: bool,
    pub last_error: Option<String>,
}

impl ManagerSnapshot {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn connected_port(&self) -> Option<&PortIdentifier> {
        match &self.state {
            ConnectionState::Connected(port) => Some(port),
            _ => None,
        }
    }
}

// ============================================================================
// Serial Manager
// ============================================================================

/// Foreground handle. Must be created inside a tokio runtime.
pub struct SerialManager {
    settings: Arc<ManagerSettings>,
    commands: mpsc::UnboundedSender<Command>,
    updates: mpsc::UnboundedReceiver<ManagerUpdate>,
    inbound: Option<mpsc::Receiver<InboundEvent>>,
    snapshot: ManagerSnapshot,
    observers: watch::Sender<ManagerSnapshot>,
    worker: Option<JoinHandle<()>>,
}

impl SerialManager {
    /// Spawn the worker and request an initial port scan.
    pub fn new(settings: ManagerSettings) -> Self {
        let settings = Arc::new(settings);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(settings.inbound_capacity.max(1));
        let (observers, _) = watch::channel(ManagerSnapshot::default());

        let worker = Worker::new(settings.clone(), update_tx, inbound_tx);
        let handle = tokio::spawn(worker.run(command_rx));

        let manager = Self {
            settings,
            commands: command_tx,
            updates: update_rx,
            inbound: Some(inbound_rx),
            snapshot: ManagerSnapshot::default(),
            observers,
            worker: Some(handle),
        };
        manager.refresh_ports();
        manager
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    fn dispatch(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tlog!("[serial] Worker is gone, request dropped");
        }
    }

    /// Rescan ports; the result lands in `available_ports`.
    pub fn refresh_ports(&self) {
        self.dispatch(Command::RefreshPorts);
    }

    /// Request a connection. Ignored while connecting or connected.
    pub fn connect(&self, port: PortIdentifier, config: LineConfig) {
        if self.snapshot.state.is_busy() {
            tlog!(
                "[serial] Ignoring connect to {}: manager is {}",
                port,
                self.snapshot.state
            );
            return;
        }
        tlog!("[serial] Connect requested: {} ({})", port, config);
        self.dispatch(Command::Connect { port, config });
    }

    /// Request a disconnect. Safe from any state.
    pub fn disconnect(&self) {
        self.dispatch(Command::Disconnect);
    }

    /// Queue bytes for transmission. Dropped with a `NotConnected` error unless connected.
    pub fn send(&mut self, bytes: impl Into<Vec<u8>>) {
        if !self.snapshot.is_connected() {
            self.apply(ManagerUpdate::Error(SerialError::NotConnected));
            return;
        }
        self.dispatch(Command::Send(bytes.into()));
    }

    /// UTF-8 encode `text`, append the line ending and send it as one write.
    pub fn send_text(&mut self, text: &str, ending: LineEnding) {
        self.send(ending.encode(text));
    }

    /// The inbound data channel. Only one consumer can take it.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.inbound.take()
    }

    /// Receive a snapshot after every applied update.
    pub fn subscribe(&self) -> watch::Receiver<ManagerSnapshot> {
        self.observers.subscribe()
    }

    /// Wait for the next worker update and apply it. `None` once the worker has stopped.
    pub async fn next_update(&mut self) -> Option<ManagerUpdate> {
        let update = self.updates.recv().await?;
        self.apply(update.clone());
        Some(update)
    }

    /// Apply every update already queued. Returns how many were applied.
    pub fn drain_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.updates.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, update: ManagerUpdate) {
        match update {
            ManagerUpdate::State(state) => {
                match &state {
                    ConnectionState::Connected(port) => {
                        tlog!("[serial] Connected to {}", port);
                        self.snapshot.last_error = None;
                    }
                    ConnectionState::Failed(e) => {
                        self.snapshot.last_error = Some(e.to_string());
                    }
                    ConnectionState::Disconnected | ConnectionState::Connecting => {}
                }
                self.snapshot.state = state;
            }
            ManagerUpdate::Ports(scan) => {
                self.snapshot.available_ports = scan.ports;
                self.snapshot.ports_are_placeholder = scan.placeholder;
            }
            ManagerUpdate::Error(e) => {
                self.snapshot.last_error = Some(e.to_string());
            }
            ManagerUpdate::ErrorCleared => {
                self.snapshot.last_error = None;
            }
        }
        self.observers.send_replace(self.snapshot.clone());
    }

    pub fn snapshot(&self) -> &ManagerSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> &ConnectionState {
        &self.snapshot.state
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.is_connected()
    }

    pub fn connected_port(&self) -> Option<&PortIdentifier> {
        self.snapshot.connected_port()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.snapshot.last_error.as_deref()
    }

    pub fn available_ports(&self) -> &[PortIdentifier] {
        &self.snapshot.available_ports
    }

    /// Stop the worker, closing any open device, and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.dispatch(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if let Err(e) = handle.await {
                tlog!("[serial] Worker task panicked: {:?}", e);
            }
        }
    }
}

impl Drop for SerialManager {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.commands.send(Command::Shutdown);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
