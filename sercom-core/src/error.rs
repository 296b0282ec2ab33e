//! Error types for the sercom system

use thiserror::Error;

use crate::types::TextEncoding;

/// Core error type for sercom operations
#[derive(Error, Debug)]
pub enum SercomError {
    /// Opening or reopening a serial connection failed
    #[error("Failed to open serial port {port}: {reason}")]
    Connection { port: String, reason: String },

    /// A connection was requested but no port identifier is configured
    #[error("No serial port configured")]
    NoPort,

    /// Port enumeration is not available on this operating system
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Outbound data cannot be represented in the configured encoding
    #[error("Byte 0x{byte:02X} at offset {offset} is not valid {encoding}")]
    Encoding {
        encoding: TextEncoding,
        offset: usize,
        byte: u8,
    },

    /// Device-level read/write failure
    #[error("Serial port error: {0}")]
    Serial(String),

    /// The I/O worker is already running
    #[error("I/O worker is already running")]
    AlreadyRunning,

    /// The I/O worker thread panicked before it could be joined cleanly
    #[error("I/O worker panicked")]
    WorkerPanicked,

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sercom operations
pub type Result<T> = std::result::Result<T, SercomError>;

impl From<toml::de::Error> for SercomError {
    fn from(err: toml::de::Error) -> Self {
        SercomError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SercomError {
    fn from(err: toml::ser::Error) -> Self {
        SercomError::Config(err.to_string())
    }
}
