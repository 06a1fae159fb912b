// src/io/serial/device.rs
//
// Owned serial device handle.
// Opens and configures a terminal device, then exposes readiness-driven
// reads and single-call writes. Dropping the handle deregisters readiness
// before the descriptor is closed.

use std::os::fd::OwnedFd;
use std::path::Path;

use chrono::Local;
use rustix::fs::{Mode, OFlags};
use rustix::io::Errno;
use rustix::termios::{tcflush, tcgetattr, tcsetattr, OptionalActions, QueueSelector};
use tokio::io::unix::AsyncFd;

use super::line_config::{translate, LineConfig};
use crate::io::error::{OsError, SerialError};
use crate::io::types::{InboundEvent, PortIdentifier};

/// An open, configured serial device. Owned by exactly one worker.
pub(crate) struct SerialDevice {
    fd: AsyncFd<OwnedFd>,
    port: PortIdentifier,
}

impl SerialDevice {
    /// Open `path`, apply `config`, flush both queues and register for readiness.
    ///
    /// Every error path drops the partially opened descriptor before returning.
    pub(crate) fn open(
        path: &Path,
        port: &PortIdentifier,
        config: &LineConfig,
    ) -> Result<Self, SerialError> {
        let path_str = path.display().to_string();

        if !path.exists() {
            return Err(SerialError::DeviceNotFound(port.to_string()));
        }

        let fd = rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::NOCTTY | OFlags::NONBLOCK | OFlags::CLOEXEC,
            Mode::empty(),
        )
        .map_err(|e| SerialError::OpenFailed {
            path: path_str.clone(),
            os: e.into(),
        })?;

        let mut termios =
            tcgetattr(&fd).map_err(|e| SerialError::AttributeReadFailed(e.into()))?;

        translate(config)
            .apply_to(&mut termios)
            .map_err(|e| SerialError::AttributeWriteFailed(e.into()))?;

        tcsetattr(&fd, OptionalActions::Now, &termios)
            .map_err(|e| SerialError::AttributeWriteFailed(e.into()))?;

        if let Err(e) = tcflush(&fd, QueueSelector::IOFlush) {
            tlog!("[serial] Flush on {} failed (continuing): {}", path_str, e);
        }

        // Readiness registration is the start of the read loop
        let fd = AsyncFd::new(fd).map_err(|e| SerialError::OpenFailed {
            path: path_str.clone(),
            os: e.into(),
        })?;

        tlog!("[serial] Opened {} ({})", path_str, config);

        Ok(Self {
            fd,
            port: port.clone(),
        })
    }

    pub(crate) fn port(&self) -> &PortIdentifier {
        &self.port
    }

    /// Wait until the device is readable and read at most `buf.len()` bytes.
    ///
    /// Returns only for a non-empty read or a failure. Empty reads and
    /// EAGAIN clear readiness and keep waiting. Cancel-safe: the only await
    /// point is the readiness wait.
    pub(crate) async fn read_chunk(&self, buf: &mut [u8]) -> Result<InboundEvent, SerialError> {
        loop {
            let mut guard = self
                .fd
                .readable()
                .await
                .map_err(|e| SerialError::ReadFailed(e.into()))?;

            match rustix::io::read(self.fd.get_ref(), &mut *buf) {
                Ok(0) => {
                    // A hang-up keeps the fd readable forever; treat it as fatal
                    if guard.ready().is_read_closed() {
                        return Err(SerialError::ReadFailed(OsError::other("device hung up")));
                    }
                    guard.clear_ready();
                }
                Ok(n) => {
                    return Ok(InboundEvent {
                        port: self.port.clone(),
                        bytes: buf[..n].to_vec(),
                        received_at: Local::now(),
                    });
                }
                Err(e) if e == Errno::AGAIN || e == Errno::WOULDBLOCK => guard.clear_ready(),
                Err(e) if e == Errno::INTR => {}
                Err(e) => return Err(SerialError::ReadFailed(e.into())),
            }
        }
    }

    /// One write call. Anything short of the full length is a failure.
    pub(crate) fn write_once(&self, bytes: &[u8]) -> Result<(), SerialError> {
        match rustix::io::write(self.fd.get_ref(), bytes) {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(n) => Err(SerialError::WriteFailed(OsError::other(format!(
                "short write: {} of {} bytes accepted",
                n,
                bytes.len()
            )))),
            Err(e) => Err(SerialError::WriteFailed(e.into())),
        }
    }

    /// Deregister readiness, then close the descriptor.
    pub(crate) fn close(self) {
        let port = self.port;
        let fd = self.fd.into_inner();
        drop(fd);
        tlog!("[serial] Closed {}", port);
    }
}

// ============================================================================
// Tests
// ============================================================================
