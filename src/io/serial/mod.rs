// src/io/serial/mod.rs
//
// Serial port connection manager.
// Provides port discovery, line configuration and an async data path over
// POSIX terminal devices.
//
// Features:
// - Port enumeration with Bluetooth filtering and known-name probing
// - termios translation for baud, data bits, parity and stop bits (raw mode)
// - Background worker owning the device (readiness-driven reads, single-call writes)
// - Foreground handle with published state, update channel and inbound data channel

mod device;
pub mod line_config;
mod manager;
pub mod ports;
mod worker;

pub use line_config::{translate, BaudRate, DataBits, LineAttributes, LineConfig, Parity, StopBits};
pub use manager::{ManagerSnapshot, SerialManager};
pub use ports::{list_ports, scan_ports, scan_ports_with, PortRegistry, PortScan, RegistryEntry};
pub use worker::ManagerUpdate;
