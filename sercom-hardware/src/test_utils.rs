//! Test utilities for exercising the handler without hardware
//!
//! [`LoopbackDevice`] is an in-memory serial device. In echo mode every byte
//! written to it becomes input waiting to be read, like a loopback plug.
//! [`LoopbackConnector`] hands out connections to a shared device and can be
//! told to refuse specific ports.

use sercom_core::{ConnectionConfig, Result, SercomError};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::connection::{Connector, SerialConnection};

#[derive(Debug, Default)]
struct DeviceState {
    echo: bool,
    pending: VecDeque<u8>,
    written: Vec<u8>,
    fail_writes: bool,
    last_read_timeout: Option<Duration>,
    close_count: usize,
    live_connections: usize,
}

/// Shared in-memory serial device
#[derive(Debug, Clone, Default)]
pub struct LoopbackDevice {
    inner: Arc<Mutex<DeviceState>>,
}

impl LoopbackDevice {
    /// Device that echoes everything written to it back as input
    pub fn new() -> Self {
        let device = Self::default();
        device.lock().echo = true;
        device
    }

    /// Device that only records writes; input comes from [`inject`](Self::inject)
    pub fn silent() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate bytes arriving on the wire
    pub fn inject(&self, data: &[u8]) {
        self.lock().pending.extend(data.iter().copied());
    }

    /// Everything written to the device so far
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes arrived but not yet read
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Make subsequent writes fail
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Read timeout most recently applied by a connection
    pub fn last_read_timeout(&self) -> Option<Duration> {
        self.lock().last_read_timeout
    }

    /// Number of explicit `close()` calls
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    /// Connections to this device that have not been dropped
    pub fn live_connections(&self) -> usize {
        self.lock().live_connections
    }
}

/// One open connection to a [`LoopbackDevice`]
#[derive(Debug)]
pub struct LoopbackConnection {
    device: LoopbackDevice,
    port_name: String,
    open: bool,
}

impl LoopbackConnection {
    pub fn new(device: LoopbackDevice, port_name: impl Into<String>) -> Self {
        device.lock().live_connections += 1;
        Self {
            device,
            port_name: port_name.into(),
            open: true,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(SercomError::Serial(format!("Port {} is closed", self.port_name)))
        }
    }
}

impl SerialConnection for LoopbackConnection {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.device.lock().close_count += 1;
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let mut device = self.device.lock();
        if device.fail_writes {
            return Err(SercomError::Serial("Write failed: Broken pipe".to_string()));
        }
        device.written.extend_from_slice(data);
        if device.echo {
            device.pending.extend(data.iter().copied());
        }
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let mut device = self.device.lock();
        if device.pending.len() < len {
            return Err(SercomError::Serial("Read failed: timed out".to_string()));
        }
        Ok(device.pending.drain(..len).collect())
    }

    fn bytes_waiting(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.device.lock().pending.len())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        self.device.lock().last_read_timeout = Some(timeout);
        Ok(())
    }
}

impl Drop for LoopbackConnection {
    fn drop(&mut self) {
        self.device.lock().live_connections -= 1;
    }
}

/// Connector that opens every port onto the same [`LoopbackDevice`]
#[derive(Debug, Default)]
pub struct LoopbackConnector {
    device: LoopbackDevice,
    refused: Mutex<HashSet<String>>,
    opened: Mutex<Vec<String>>,
}

impl LoopbackConnector {
    pub fn new(device: LoopbackDevice) -> Self {
        Self {
            device,
            refused: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Make opening `port` fail as if the device were busy
    pub fn refuse(&self, port: &str) {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port.to_string());
    }

    /// Ports successfully opened, in order
    pub fn opened_ports(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Connector for LoopbackConnector {
    fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn SerialConnection>> {
        let port = config.port.clone().ok_or(SercomError::NoPort)?;

        let refused = self
            .refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&port);
        if refused {
            return Err(SercomError::Connection {
                port,
                reason: "Device or resource busy".to_string(),
            });
        }

        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(port.clone());
        Ok(Box::new(LoopbackConnection::new(self.device.clone(), port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_device_reflects_writes() {
        let device = LoopbackDevice::new();
        let mut conn = LoopbackConnection::new(device.clone(), "loop0");

        conn.write_all(b"ping").unwrap();
        assert_eq!(conn.bytes_waiting().unwrap(), 4);
        assert_eq!(conn.read_exact(4).unwrap(), b"ping");
        assert_eq!(device.written(), b"ping");
    }

    #[test]
    fn test_closed_connection_rejects_io() {
        let device = LoopbackDevice::silent();
        let mut conn = LoopbackConnection::new(device.clone(), "loop0");

        conn.close();
        assert!(!conn.is_open());
        assert!(conn.write_all(b"x").is_err());
        assert_eq!(device.close_count(), 1);
    }

    #[test]
    fn test_connector_tracks_and_refuses() {
        let connector = LoopbackConnector::new(LoopbackDevice::silent());
        connector.refuse("busy");

        assert!(connector.open(&ConnectionConfig::for_port("ok")).is_ok());
        assert!(connector.open(&ConnectionConfig::for_port("busy")).is_err());
        assert!(matches!(
            connector.open(&ConnectionConfig::default()),
            Err(SercomError::NoPort)
        ));
        assert_eq!(connector.opened_ports(), vec!["ok"]);
    }
}
