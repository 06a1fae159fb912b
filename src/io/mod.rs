// src/io/mod.rs
//
// Device I/O for SerialDebug.
// Shared types and errors live here; the serial driver lives in `serial`.

mod error;
pub mod serial;
mod types;

pub use error::{OsError, SerialError};
pub use types::{ConnectionState, InboundEvent, LineEnding, PortIdentifier};
