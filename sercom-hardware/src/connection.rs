//! Serial connection collaborator
//!
//! The handler only needs a handful of operations from an open device. They
//! are expressed as the [`SerialConnection`] trait so the worker can be
//! exercised against in-memory devices, and [`Connector`] is the factory the
//! handler uses whenever it has to (re)open a port.

use sercom_core::{ConnectionConfig, DataBits, Parity, Result, SercomError, StopBits};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Timeout used when the configuration asks for a blocking read or write.
///
/// The serial backend has no "wait forever" setting, so a day stands in for it.
pub const BLOCKING_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// An open serial device
pub trait SerialConnection: Send {
    /// Name of the port this connection was opened on
    fn port_name(&self) -> &str;

    /// Whether the underlying device handle is still open
    fn is_open(&self) -> bool;

    /// Release the device. Further I/O fails until the port is reopened.
    fn close(&mut self);

    /// Write the whole payload to the device
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes from the device
    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Number of bytes the device has received but nobody has read yet
    fn bytes_waiting(&self) -> Result<usize>;

    /// Change the read timeout of an open connection
    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()>;
}

/// Opens serial connections from a configuration
pub trait Connector: Send + Sync {
    fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn SerialConnection>>;
}

/// Connector backed by the operating system's serial devices
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConnector;

impl Connector for SystemConnector {
    fn open(&self, config: &ConnectionConfig) -> Result<Box<dyn SerialConnection>> {
        Ok(Box::new(SerialDriver::open(config)?))
    }
}

/// Serial driver over the `serialport` crate
///
/// The backend keeps a single timeout for both directions. The configured
/// timeout is reapplied before every write so that raising the read timeout
/// never lengthens how long a write may block.
pub struct SerialDriver {
    port: Option<Box<dyn serialport::SerialPort>>,
    port_name: String,
    write_timeout: Duration,
    read_timeout: Duration,
}

impl SerialDriver {
    /// Open the port named in `config` with all of its line settings
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let port_name = config.port.clone().ok_or(SercomError::NoPort)?;
        debug!("Opening serial port: {} @ {} baud", port_name, config.baud_rate);

        if config.dsrdtr {
            debug!("DSR/DTR flow control is not supported by the backend; ignoring");
        }
        if config.inter_byte_timeout_ms.is_some() {
            debug!("Inter-byte timeout is not supported by the backend; ignoring");
        }

        // The backend has one timeout for both directions; the tighter one wins.
        let timeout = match (config.read_timeout(), config.write_timeout()) {
            (Some(r), Some(w)) => r.min(w),
            (Some(t), None) | (None, Some(t)) => t,
            (None, None) => BLOCKING_TIMEOUT,
        };

        let builder = serialport::new(port_name.as_str(), config.baud_rate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .flow_control(flow_control(config))
            .timeout(timeout);

        let port = open_builder(builder, config.exclusive).map_err(|e| {
            error!("Failed to open serial port {}: {}", port_name, e);
            SercomError::Connection {
                port: port_name.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!("Serial port {} opened successfully", port_name);

        Ok(Self {
            port: Some(port),
            port_name,
            write_timeout: timeout,
            read_timeout: timeout,
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>> {
        let name = &self.port_name;
        self.port
            .as_mut()
            .ok_or_else(|| SercomError::Serial(format!("Port {} is closed", name)))
    }
}

#[cfg(unix)]
fn open_builder(
    builder: serialport::SerialPortBuilder,
    exclusive: Option<bool>,
) -> serialport::Result<Box<dyn serialport::SerialPort>> {
    let mut port = builder.open_native()?;
    if let Some(exclusive) = exclusive {
        port.set_exclusive(exclusive)?;
    }
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_builder(
    builder: serialport::SerialPortBuilder,
    _exclusive: Option<bool>,
) -> serialport::Result<Box<dyn serialport::SerialPort>> {
    // Windows COM ports are always opened exclusively.
    builder.open()
}

impl SerialConnection for SerialDriver {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.port_name);
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.write_timeout;
        let port = self.port_mut()?;
        port.set_timeout(timeout)
            .map_err(|e| SercomError::Serial(format!("Failed to set timeout: {}", e)))?;
        port.write_all(data)
            .and_then(|_| port.flush())
            .map_err(|e| SercomError::Serial(format!("Write failed: {}", e)))
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let timeout = self.read_timeout;
        let port = self.port_mut()?;
        port.set_timeout(timeout)
            .map_err(|e| SercomError::Serial(format!("Failed to set timeout: {}", e)))?;
        let mut buf = vec![0u8; len];
        port.read_exact(&mut buf)
            .map_err(|e| SercomError::Serial(format!("Read failed: {}", e)))?;
        Ok(buf)
    }

    fn bytes_waiting(&self) -> Result<usize> {
        let port = self
            .port
            .as_ref()
            .ok_or_else(|| SercomError::Serial(format!("Port {} is closed", self.port_name)))?;
        port.bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| SercomError::Serial(format!("Failed to query input queue: {}", e)))
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port_mut()?;
        self.read_timeout = timeout;
        Ok(())
    }
}

impl Drop for SerialDriver {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SerialDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDriver")
            .field("port_name", &self.port_name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

fn data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

/// Pick the single flow-control mode the backend supports
fn flow_control(config: &ConnectionConfig) -> serialport::FlowControl {
    match (config.rtscts, config.xonxoff) {
        (true, true) => {
            warn!("Both RTS/CTS and XON/XOFF requested; using hardware flow control");
            serialport::FlowControl::Hardware
        }
        (true, false) => serialport::FlowControl::Hardware,
        (false, true) => serialport::FlowControl::Software,
        (false, false) => serialport::FlowControl::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use serialport::SerialPort;

    #[test]
    fn test_open_without_port_fails() {
        let result = SerialDriver::open(&ConnectionConfig::default());
        assert!(matches!(result, Err(SercomError::NoPort)));
    }

    #[test]
    fn test_open_nonexistent_port_is_connection_error() {
        let config = ConnectionConfig::for_port("/dev/nonexistent_sercom_port_12345");
        match SystemConnector.open(&config) {
            Err(SercomError::Connection { port, .. }) => {
                assert!(port.contains("nonexistent"));
            }
            Err(e) => panic!("Expected Connection error, got: {:?}", e),
            Ok(_) => panic!("Expected Connection error, got an open port"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_write_timeout_survives_raised_read_timeout() {
        let (_master, slave) = serialport::TTYPort::pair().unwrap();
        let config = ConnectionConfig {
            write_timeout_ms: Some(50),
            ..ConnectionConfig::for_port(slave.name().unwrap())
        };
        let mut driver = SerialDriver::open(&config).unwrap();

        // What the worker does before each receive pass
        driver.set_read_timeout(Duration::from_secs(100)).unwrap();
        driver.write_all(b"AT\r\n").unwrap();

        let applied = driver.port.as_ref().unwrap().timeout();
        assert_eq!(applied, Duration::from_millis(50));
        assert_eq!(driver.read_timeout, Duration::from_secs(100));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_uses_raised_timeout() {
        let (mut master, slave) = serialport::TTYPort::pair().unwrap();
        let config = ConnectionConfig {
            read_timeout_ms: Some(50),
            ..ConnectionConfig::for_port(slave.name().unwrap())
        };
        let mut driver = SerialDriver::open(&config).unwrap();
        master.write_all(b"OK").unwrap();

        driver.set_read_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(driver.read_exact(2).unwrap(), b"OK");
        assert_eq!(
            driver.port.as_ref().unwrap().timeout(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_flow_control_mapping() {
        let mut config = ConnectionConfig::default();
        assert_eq!(flow_control(&config), serialport::FlowControl::None);

        config.xonxoff = true;
        assert_eq!(flow_control(&config), serialport::FlowControl::Software);

        config.rtscts = true;
        assert_eq!(flow_control(&config), serialport::FlowControl::Hardware);
    }

    #[test]
    fn test_line_setting_mapping() {
        assert_eq!(data_bits(DataBits::Seven), serialport::DataBits::Seven);
        assert_eq!(parity(Parity::Odd), serialport::Parity::Odd);
        assert_eq!(stop_bits(StopBits::Two), serialport::StopBits::Two);
    }
}
