// src/io/types.rs
//
// Shared value types for the serial connection manager.
// Used by the worker to publish state and by consumers to read it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::error::SerialError;

// ============================================================================
// Port Identifier
// ============================================================================

/// Leaf name of a device node under the device directory (e.g. `cu.usbserial-0001`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortIdentifier(String);

impl PortIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortIdentifier {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for PortIdentifier {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for PortIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Connection State
// ============================================================================

/// Authoritative connection status, published by the worker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(PortIdentifier),
    Failed(SerialError),
}

impl ConnectionState {
    /// True while a connect request would be rejected.
    pub fn is_busy(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected(port) => write!(f, "connected to {}", port),
            ConnectionState::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

// ============================================================================
// Inbound Data
// ============================================================================

/// Bytes from one non-empty read. Never reassembled or split.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub port: PortIdentifier,
    pub bytes: Vec<u8>,
    /// Host time the read completed
    pub received_at: DateTime<Local>,
}

// ============================================================================
// Line Ending
// ============================================================================

/// Suffix appended to outgoing text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    None,
    Cr,
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn suffix(&self) -> &'static str {
        match self {
            LineEnding::None => "",
            LineEnding::Cr => "\r",
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// UTF-8 bytes of `text` followed by the suffix.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let suffix = self.suffix();
        let mut bytes = Vec::with_capacity(text.len() + suffix.len());
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(suffix.as_bytes());
        bytes
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEnding::None => "none",
            LineEnding::Cr => "cr",
            LineEnding::Lf => "lf",
            LineEnding::CrLf => "crlf",
        })
    }
}

impl FromStr for LineEnding {
    type Err = String;

    /// Accepts the names (`none`, `cr`, `lf`, `crlf`) and the escaped literals (`\r`, `\n`, `\r\n`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(LineEnding::None),
            "cr" | "\\r" => Ok(LineEnding::Cr),
            "lf" | "nl" | "\\n" => Ok(LineEnding::Lf),
            "crlf" | "\\r\\n" => Ok(LineEnding::CrLf),
            other => Err(format!("Unknown line ending '{}'", other)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
