// SerialDebug core: serial port connection manager.
//
// The UI layer holds a `SerialManager`, issues connect/disconnect/send
// requests, drains state updates and consumes inbound data events. All
// device I/O happens on the manager's background worker.

#[macro_use]
mod logging;
pub mod io;
pub mod settings;

pub use io::serial::{
    list_ports, scan_ports, translate, BaudRate, DataBits, LineAttributes, LineConfig,
    ManagerSnapshot, ManagerUpdate, Parity, PortScan, SerialManager, StopBits,
};
pub use io::{ConnectionState, InboundEvent, LineEnding, OsError, PortIdentifier, SerialError};
pub use logging::{init_file_logging, init_logging, stop_file_logging};
pub use settings::{load_settings, ManagerSettings};
