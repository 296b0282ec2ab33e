//! Tuning for the background I/O worker

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{InboundPolicy, TextEncoding};

/// Sleep between the send pass and the receive pass, and again after it
pub const DEFAULT_DWELL_MS: u64 = 100;

/// Read timeout raised on the device before every receive pass
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 100_000;

/// Worker and buffer settings for a serial handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Duty-cycle dwell in milliseconds
    pub dwell_ms: u64,
    /// Device read timeout applied before each receive pass
    pub receive_timeout_ms: u64,
    /// Encoding outbound data is validated against
    pub encoding: TextEncoding,
    /// Policy for unclaimed inbound data
    pub inbound: InboundPolicy,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            dwell_ms: DEFAULT_DWELL_MS,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            encoding: TextEncoding::default(),
            inbound: InboundPolicy::default(),
        }
    }
}

impl HandlerConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handler_config() {
        let config = HandlerConfig::default();
        assert_eq!(config.dwell(), Duration::from_millis(100));
        assert_eq!(config.receive_timeout(), Duration::from_secs(100));
        assert_eq!(config.encoding, TextEncoding::Ascii);
        assert_eq!(config.inbound, InboundPolicy::Overwrite);
    }
}
