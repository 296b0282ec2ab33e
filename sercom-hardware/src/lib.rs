//! sercom-hardware
//!
//! Background serial-port I/O handler. A [`SerialHandler`] owns one serial
//! connection and a worker thread that keeps draining queued outbound bytes
//! to the device and collecting inbound bytes for callers to poll.
//
//! Public API:
//! - `handler::SerialHandler` — lifecycle and buffer exchange
//! - `connection::{SerialConnection, Connector}` — device abstraction and factory
//! - `ports::list_candidate_ports` — discover serial ports that can be opened

pub mod buffers;
pub mod connection;
pub mod handler;
pub mod ports;
mod worker;

// Loopback device used by this crate's tests and by downstream integration tests
#[doc(hidden)]
pub mod test_utils;

pub use buffers::TransferBuffers;
pub use connection::{Connector, SerialConnection, SerialDriver, SystemConnector};
pub use handler::SerialHandler;
pub use ports::{list_candidate_ports, Platform};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_present() {
        let _ = std::any::TypeId::of::<SerialHandler>();
        let _ = std::any::TypeId::of::<SerialDriver>();
        let _ = std::any::TypeId::of::<TransferBuffers>();
    }
}
