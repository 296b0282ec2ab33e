//! Background I/O worker
//!
//! One worker thread per handler alternates between a send pass and a
//! receive pass with a dwell interval after each. Both passes run entirely
//! under the handler's lock, so callers never observe a half-drained buffer
//! or a connection that is being replaced.
//!
//! Dwell intervals are spent waiting on the stop channel. Dropping the sender
//! (what `SerialHandler::stop` does) wakes the worker immediately instead of
//! letting it finish the sleep.

use sercom_core::{HandlerConfig, Result};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::connection::SerialConnection;
use crate::handler::{lock_state, HandlerState, SharedState};

pub(crate) struct IoWorker {
    state: SharedState,
    stop_rx: Receiver<()>,
    dwell: Duration,
    receive_timeout: Duration,
}

impl IoWorker {
    pub(crate) fn new(state: SharedState, stop_rx: Receiver<()>, config: &HandlerConfig) -> Self {
        Self {
            state,
            stop_rx,
            dwell: config.dwell(),
            receive_timeout: config.receive_timeout(),
        }
    }

    /// Worker thread body; returns once a stop has been requested
    pub(crate) fn run(self) {
        info!("I/O worker started (dwell: {:?})", self.dwell);

        loop {
            let connected = lock_state(&self.state).connection.is_some();

            if connected {
                send_pass(&mut lock_state(&self.state));
                if self.dwell_or_stop() {
                    break;
                }
                receive_pass(&mut lock_state(&self.state), self.receive_timeout);
                if self.dwell_or_stop() {
                    break;
                }
            } else {
                discard_unsendable(&mut lock_state(&self.state));
                if self.dwell_or_stop() {
                    break;
                }
            }

            if lock_state(&self.state).stop_requested {
                break;
            }
        }

        info!("I/O worker stopped");
    }

    /// Sleep for one dwell interval. Returns `true` if a stop arrived instead.
    fn dwell_or_stop(&self) -> bool {
        match self.stop_rx.recv_timeout(self.dwell) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

/// Write the whole outbound buffer to the device and clear it
pub(crate) fn send_pass(state: &mut HandlerState) {
    let Some(connection) = state.connection.as_mut() else {
        return;
    };
    let Some(data) = state.buffers.take_outbound() else {
        return;
    };

    match connection.write_all(&data) {
        Ok(()) => debug!("TX {} bytes to {}", data.len(), connection.port_name()),
        Err(e) => {
            error!(
                "Send pass on {} lost {} bytes: {}",
                connection.port_name(),
                data.len(),
                e
            );
            state.last_error = Some(e);
        }
    }
}

/// Read whatever the device has waiting into the inbound buffer
pub(crate) fn receive_pass(state: &mut HandlerState, read_timeout: Duration) {
    let Some(connection) = state.connection.as_mut() else {
        return;
    };

    match read_waiting(&mut **connection, read_timeout) {
        Ok(Some(data)) => {
            debug!("RX {} bytes from {}", data.len(), connection.port_name());
            state.buffers.store_inbound(data);
        }
        Ok(None) => {}
        Err(e) => {
            error!("Receive pass on {} failed: {}", connection.port_name(), e);
            state.last_error = Some(e);
        }
    }
}

fn read_waiting(
    connection: &mut dyn SerialConnection,
    read_timeout: Duration,
) -> Result<Option<Vec<u8>>> {
    connection.set_read_timeout(read_timeout)?;
    let waiting = connection.bytes_waiting()?;
    if waiting == 0 {
        return Ok(None);
    }
    connection.read_exact(waiting).map(Some)
}

/// With no device configured, queued outbound data has nowhere to go
pub(crate) fn discard_unsendable(state: &mut HandlerState) {
    // set_port may have connected since the caller last looked
    if state.connection.is_some() {
        return;
    }
    if let Some(data) = state.buffers.take_outbound() {
        warn!("No serial port configured; discarding {} outbound bytes", data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::TransferBuffers;
    use crate::test_utils::{LoopbackConnection, LoopbackDevice};
    use sercom_core::{ConnectionConfig, InboundPolicy, SercomError};

    fn state_with(device: Option<&LoopbackDevice>) -> HandlerState {
        HandlerState::new(
            ConnectionConfig::default(),
            device.map(|d| {
                Box::new(LoopbackConnection::new(d.clone(), "/dev/ttyTEST0"))
                    as Box<dyn SerialConnection>
            }),
            TransferBuffers::new(InboundPolicy::Overwrite),
        )
    }

    #[test]
    fn test_send_pass_writes_concatenation_and_clears() {
        let device = LoopbackDevice::silent();
        let mut state = state_with(Some(&device));
        state.buffers.enqueue(b"AT");
        state.buffers.enqueue(b"I\r\n");

        send_pass(&mut state);

        assert_eq!(device.written(), b"ATI\r\n");
        assert_eq!(state.buffers.outbound_len(), 0);
    }

    #[test]
    fn test_send_pass_with_empty_buffer_writes_nothing() {
        let device = LoopbackDevice::silent();
        let mut state = state_with(Some(&device));

        send_pass(&mut state);

        assert!(device.written().is_empty());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_send_pass_records_write_failure() {
        let device = LoopbackDevice::silent();
        device.fail_writes(true);
        let mut state = state_with(Some(&device));
        state.buffers.enqueue(b"lost");

        send_pass(&mut state);

        assert!(matches!(state.last_error, Some(SercomError::Serial(_))));
        assert_eq!(state.buffers.outbound_len(), 0);
    }

    #[test]
    fn test_receive_pass_reads_everything_waiting() {
        let device = LoopbackDevice::silent();
        device.inject(b"OK\r\n");
        let mut state = state_with(Some(&device));

        receive_pass(&mut state, Duration::from_secs(100));

        assert_eq!(device.pending(), 0);
        assert_eq!(device.last_read_timeout(), Some(Duration::from_secs(100)));
        assert_eq!(state.buffers.take_inbound(), b"OK\r\n");
    }

    #[test]
    fn test_receive_pass_with_nothing_waiting_leaves_buffer_empty() {
        let device = LoopbackDevice::silent();
        let mut state = state_with(Some(&device));

        receive_pass(&mut state, Duration::from_millis(10));

        assert!(!state.buffers.has_inbound());
    }

    #[test]
    fn test_two_receive_passes_overwrite() {
        let device = LoopbackDevice::silent();
        let mut state = state_with(Some(&device));

        device.inject(b"first");
        receive_pass(&mut state, Duration::from_millis(10));
        device.inject(b"second");
        receive_pass(&mut state, Duration::from_millis(10));

        assert_eq!(state.buffers.take_inbound(), b"second");
        assert!(state.buffers.take_inbound().is_empty());
    }

    #[test]
    fn test_passes_without_connection_are_noops() {
        let mut state = state_with(None);
        state.buffers.enqueue(b"AT\r\n");

        send_pass(&mut state);
        receive_pass(&mut state, Duration::from_millis(10));
        assert_eq!(state.buffers.outbound_len(), 4);

        discard_unsendable(&mut state);
        assert_eq!(state.buffers.outbound_len(), 0);
    }

    #[test]
    fn test_discard_leaves_data_for_connected_device() {
        let device = LoopbackDevice::silent();
        let mut state = state_with(Some(&device));
        state.buffers.enqueue(b"AT\r\n");

        discard_unsendable(&mut state);

        assert_eq!(state.buffers.outbound_len(), 4);
    }

    #[test]
    fn test_loopback_send_then_receive() {
        let device = LoopbackDevice::new();
        let mut state = state_with(Some(&device));
        state.buffers.enqueue(b"ping");

        send_pass(&mut state);
        receive_pass(&mut state, Duration::from_millis(10));

        assert_eq!(state.buffers.take_inbound(), b"ping");
    }
}
