//! Serial line settings
//!
//! Mirrors the knobs a serial connection is opened with. Once a connection
//! is open these values are not reapplied; changing the port means closing
//! and reopening.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{DataBits, Parity, StopBits};

/// Default baud rate for new connections
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Connection configuration for a single serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Device path or name (e.g. "/dev/ttyUSB0", "COM3"). `None` defers opening.
    pub port: Option<String>,
    /// Line speed in bits per second
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Software (XON/XOFF) flow control
    pub xonxoff: bool,
    /// Hardware (RTS/CTS) flow control
    pub rtscts: bool,
    /// Hardware (DSR/DTR) flow control
    pub dsrdtr: bool,
    /// Read timeout in milliseconds; `None` blocks until data arrives
    pub read_timeout_ms: Option<u64>,
    /// Write timeout in milliseconds; `None` blocks until data is written
    pub write_timeout_ms: Option<u64>,
    /// Maximum gap between bytes of a single read in milliseconds
    pub inter_byte_timeout_ms: Option<u64>,
    /// Request exclusive access to the device; `None` keeps the platform default
    pub exclusive: Option<bool>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            xonxoff: false,
            rtscts: false,
            dsrdtr: false,
            read_timeout_ms: None,
            write_timeout_ms: None,
            inter_byte_timeout_ms: None,
            exclusive: None,
        }
    }
}

impl ConnectionConfig {
    /// Configuration for `port` with every other setting at its default
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: Some(port.into()),
            ..Default::default()
        }
    }

    /// Builder-style baud rate override
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}
