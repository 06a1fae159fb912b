// src/io/serial/worker.rs
//
// Background worker that owns the serial device.
// A single task multiplexes foreground commands with device readiness, so
// opening, configuring, reading, writing and closing never overlap.
// State changes travel back to the foreground as `ManagerUpdate` messages.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::device::SerialDevice;
use super::line_config::LineConfig;
use super::ports::{scan_ports, PortScan};
use crate::io::error::SerialError;
use crate::io::types::{ConnectionState, InboundEvent, PortIdentifier};
use crate::settings::ManagerSettings;

/// Payload prefix shown in write-error logs
const LOGGED_PAYLOAD_BYTES: usize = 32;

// ============================================================================
// Messages
// ============================================================================

/// Requests from the foreground handle.
#[derive(Debug)]
pub(crate) enum Command {
    RefreshPorts,
    Connect {
        port: PortIdentifier,
        config: LineConfig,
    },
    Disconnect,
    Send(Vec<u8>),
    Shutdown,
}

/// Updates marshalled from the worker to the foreground handle.
#[derive(Clone, Debug, PartialEq)]
pub enum ManagerUpdate {
    State(ConnectionState),
    Ports(PortScan),
    /// An error that does not change the connection state
    Error(SerialError),
    /// Explicit disconnect clears the last error
    ErrorCleared,
}

enum Step {
    Command(Option<Command>),
    Read(Result<InboundEvent, SerialError>),
    Delivered,
}

// ============================================================================
// Worker
// ============================================================================

pub(crate) struct Worker {
    settings: Arc<ManagerSettings>,
    device: Option<SerialDevice>,
    updates: mpsc::UnboundedSender<ManagerUpdate>,
    inbound: mpsc::Sender<InboundEvent>,
}

impl Worker {
    pub(crate) fn new(
        settings: Arc<ManagerSettings>,
        updates: mpsc::UnboundedSender<ManagerUpdate>,
        inbound: mpsc::Sender<InboundEvent>,
    ) -> Self {
        Self {
            settings,
            device: None,
            updates,
            inbound,
        }
    }

    /// Run until `Shutdown` arrives or the foreground handle goes away.
    ///
    /// A read is held in `pending` until the inbound channel has room. While
    /// it waits, commands are still served and the device is not read.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut buf = vec![0u8; self.settings.read_chunk_size.max(1)];
        let mut pending: Option<InboundEvent> = None;

        loop {
            let step = if let Some(event) = pending.take() {
                tokio::select! {
                    biased;
                    cmd = commands.recv() => {
                        pending = Some(event);
                        Step::Command(cmd)
                    }
                    permit = self.inbound.reserve() => {
                        // Receiver dropped: nobody will ever read it
                        if let Ok(permit) = permit {
                            permit.send(event);
                        }
                        Step::Delivered
                    }
                }
            } else {
                match self.device.as_ref() {
                    Some(device) => tokio::select! {
                        biased;
                        cmd = commands.recv() => Step::Command(cmd),
                        read = device.read_chunk(&mut buf) => Step::Read(read),
                    },
                    None => Step::Command(commands.recv().await),
                }
            };

            match step {
                Step::Command(Some(Command::RefreshPorts)) => self.refresh_ports().await,
                Step::Command(Some(Command::Connect { port, config })) => {
                    self.connect(port, config)
                }
                Step::Command(Some(Command::Disconnect)) => {
                    if let Some(event) = pending.take() {
                        tlog!(
                            "[serial] Dropping {} undelivered byte(s) from {}",
                            event.bytes.len(),
                            event.port
                        );
                    }
                    self.disconnect()
                }
                Step::Command(Some(Command::Send(bytes))) => self.send(&bytes),
                Step::Command(Some(Command::Shutdown)) | Step::Command(None) => break,
                Step::Read(Ok(event)) => pending = Some(event),
                Step::Read(Err(e)) => self.fail_session(e),
                Step::Delivered => {}
            }
        }

        if let Some(device) = self.device.take() {
            device.close();
        }
        tlog!("[serial] Worker stopped");
    }

    fn publish(&self, update: ManagerUpdate) {
        // The foreground may already be gone during teardown
        let _ = self.updates.send(update);
    }

    async fn refresh_ports(&self) {
        let settings = self.settings.clone();
        match tokio::task::spawn_blocking(move || scan_ports(&settings)).await {
            Ok(scan) => self.publish(ManagerUpdate::Ports(scan)),
            Err(e) => tlog!("[ports] Port scan task failed: {:?}", e),
        }
    }

    fn connect(&mut self, port: PortIdentifier, config: LineConfig) {
        if let Some(device) = &self.device {
            tlog!(
                "[serial] Ignoring connect to {}: already connected to {}",
                port,
                device.port()
            );
            return;
        }

        self.publish(ManagerUpdate::State(ConnectionState::Connecting));

        let path = self.settings.device_path(port.as_str());
        match SerialDevice::open(&path, &port, &config) {
            Ok(device) => {
                self.device = Some(device);
                self.publish(ManagerUpdate::State(ConnectionState::Connected(port)));
            }
            Err(e @ SerialError::DeviceNotFound(_)) => {
                tlog!("[serial] {}", e);
                self.publish(ManagerUpdate::State(ConnectionState::Disconnected));
                self.publish(ManagerUpdate::Error(e));
            }
            Err(e) => {
                tlog!("[serial] Connect to {} failed: {}", port, e);
                self.publish(ManagerUpdate::State(ConnectionState::Failed(e)));
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(device) = self.device.take() {
            device.close();
        }
        self.publish(ManagerUpdate::State(ConnectionState::Disconnected));
        self.publish(ManagerUpdate::ErrorCleared);
    }

    fn send(&self, bytes: &[u8]) {
        let Some(device) = &self.device else {
            self.publish(ManagerUpdate::Error(SerialError::NotConnected));
            return;
        };

        if bytes.is_empty() {
            return;
        }

        if let Err(e) = device.write_once(bytes) {
            let shown = &bytes[..bytes.len().min(LOGGED_PAYLOAD_BYTES)];
            tlog!(
                "[serial] {} on {} (payload {}{})",
                e,
                device.port(),
                hex::encode(shown),
                if shown.len() < bytes.len() { "..." } else { "" }
            );
            self.publish(ManagerUpdate::Error(e));
        }
    }

    /// Read failure: tear the session down without waiting for a disconnect request.
    fn fail_session(&mut self, error: SerialError) {
        if let Some(device) = self.device.take() {
            tlog!("[serial] {} on {}, closing", error, device.port());
            device.close();
        }
        self.publish(ManagerUpdate::State(ConnectionState::Failed(error)));
    }
}
