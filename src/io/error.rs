// src/io/error.rs
//
// Error taxonomy for the serial connection manager.
// Every variant carries enough context to be shown to the operator as-is.

use std::fmt;

use rustix::io::Errno;

// ============================================================================
// OS Error
// ============================================================================

/// An OS-level failure captured by value so it can be cloned into published state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OsError {
    /// Raw errno, when the failure came from a syscall
    pub code: Option<i32>,
    pub message: String,
}

impl OsError {
    /// Failure that did not come with an errno (short writes, hang-ups).
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

impl From<Errno> for OsError {
    fn from(errno: Errno) -> Self {
        Self {
            code: Some(errno.raw_os_error()),
            message: std::io::Error::from(errno).to_string(),
        }
    }
}

impl From<std::io::Error> for OsError {
    fn from(err: std::io::Error) -> Self {
        Self {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // io::Error's Display already appends "(os error N)"
        f.write_str(&self.message)
    }
}

// ============================================================================
// Serial Error
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SerialError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open {path}: {os}")]
    OpenFailed { path: String, os: OsError },

    #[error("Failed to read serial attributes: {0}")]
    AttributeReadFailed(OsError),

    #[error("Failed to apply serial attributes: {0}")]
    AttributeWriteFailed(OsError),

    #[error("Read error: {0}")]
    ReadFailed(OsError),

    #[error("Write error: {0}")]
    WriteFailed(OsError),

    #[error("Not connected")]
    NotConnected,
}

impl SerialError {
    /// Underlying OS error, if the variant carries one.
    pub fn os_error(&self) -> Option<&OsError> {
        match self {
            SerialError::OpenFailed { os, .. } => Some(os),
            SerialError::AttributeReadFailed(e)
            | SerialError::AttributeWriteFailed(e)
            | SerialError::ReadFailed(e)
            | SerialError::WriteFailed(e) => Some(e),
            SerialError::DeviceNotFound(_) | SerialError::NotConnected => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_error_from_errno_keeps_code() {
        let err = OsError::from(Errno::NOENT);
        assert_eq!(err.code, Some(Errno::NOENT.raw_os_error()));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_open_failed_message_names_path() {
        let err = SerialError::OpenFailed {
            path: "/dev/cu.usbserial-0001".to_string(),
            os: OsError::from(Errno::ACCESS),
        };
        let text = err.to_string();
        assert!(text.starts_with("Failed to open /dev/cu.usbserial-0001: "));
        assert_eq!(err.os_error().and_then(|e| e.code), Some(Errno::ACCESS.raw_os_error()));
    }

    #[test]
    fn test_short_write_has_no_code() {
        let err = SerialError::WriteFailed(OsError::other("short write: 2 of 4 bytes accepted"));
        assert_eq!(err.os_error().and_then(|e| e.code), None);
        assert_eq!(err.to_string(), "Write error: short write: 2 of 4 bytes accepted");
    }

    #[test]
    fn test_not_found_and_not_connected_carry_no_os_error() {
        assert!(SerialError::DeviceNotFound("cu.x".into()).os_error().is_none());
        assert!(SerialError::NotConnected.os_error().is_none());
    }
}
