//! Static configuration loaded once at startup

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ConnectionConfig, HandlerConfig};
use crate::error::Result;

/// Interactive console settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Appended to every line typed at the console before it is sent
    pub line_ending: String,
    /// How often the console polls for received data, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            line_ending: "\r\n".to_string(),
            poll_interval_ms: 50,
        }
    }
}

/// Static configuration for sercom.
///
/// Located at `~/.config/sercom/config.toml` by default. Every section is
/// optional; missing sections and keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Serial line settings
    pub connection: ConnectionConfig,

    /// Background worker tuning
    pub handler: HandlerConfig,

    /// Interactive console settings
    pub console: ConsoleConfig,
}

impl StaticConfig {
    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SercomError;
    use crate::types::{InboundPolicy, Parity, StopBits, TextEncoding};
    use tempfile::TempDir;

    #[test]
    fn test_default_static_config() {
        let config = StaticConfig::default();
        assert_eq!(config.connection.baud_rate, 115_200);
        assert_eq!(config.handler.dwell_ms, 100);
        assert_eq!(config.console.line_ending, "\r\n");
    }

    #[test]
    fn test_static_config_serialization() {
        let config = StaticConfig::default();
        let toml_str = config.to_toml().unwrap();

        assert!(toml_str.contains("[connection]"));
        assert!(toml_str.contains("[handler]"));
        assert!(toml_str.contains("[console]"));
    }

    #[test]
    fn test_static_config_deserialization() {
        let toml_str = r#"
            [connection]
            port = "/dev/ttyUSB1"
            baud_rate = 9600
            parity = "even"
            stop_bits = 2
            rtscts = true
            read_timeout_ms = 500

            [handler]
            dwell_ms = 20
            encoding = "binary"
            inbound = { mode = "append", max_len = 4096 }

            [console]
            line_ending = "\n"
        "#;

        let config = StaticConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.connection.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.connection.baud_rate, 9600);
        assert_eq!(config.connection.parity, Parity::Even);
        assert_eq!(config.connection.stop_bits, StopBits::Two);
        assert!(config.connection.rtscts);
        assert_eq!(config.connection.read_timeout_ms, Some(500));
        assert_eq!(config.handler.dwell_ms, 20);
        assert_eq!(config.handler.encoding, TextEncoding::Binary);
        assert_eq!(
            config.handler.inbound,
            InboundPolicy::Append { max_len: 4096 }
        );
        assert_eq!(config.console.line_ending, "\n");
        assert_eq!(config.console.poll_interval_ms, 50);
    }

    #[test]
    fn test_invalid_data_bits_rejected() {
        let result = StaticConfig::from_toml("[connection]\ndata_bits = 9\n");
        assert!(matches!(result, Err(SercomError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = StaticConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, StaticConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[connection]\nbaud_rate = 57600\n").unwrap();

        let config = StaticConfig::load(&path).unwrap();
        assert_eq!(config.connection.baud_rate, 57600);
        assert_eq!(config.handler, HandlerConfig::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = StaticConfig::default();
        config.connection.port = Some("COM4".to_string());
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(StaticConfig::load(&path).unwrap(), config);
    }
}
