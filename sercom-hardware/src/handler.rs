//! Serial handler - public facade over the I/O worker
//!
//! A [`SerialHandler`] owns one serial connection, an outbound and an inbound
//! buffer, and the lifecycle of one background worker thread. All of that
//! state sits behind a single mutex: callers and the worker take the same
//! lock for every buffer access, every flag check and every use of the
//! connection handle, so `set_port` can never swap the handle out from under
//! a pass in progress.
//!
//! # Lifecycle
//!
//! - `start()` while a worker is starting or running returns
//!   [`SercomError::AlreadyRunning`]. After `stop()` the handler can be
//!   started again.
//! - `stop()` without a running worker is a no-op.
//! - Dropping the handler stops its worker.
//!
//! # Limitations
//!
//! - With the default [`InboundPolicy::Overwrite`](sercom_core::InboundPolicy)
//!   at most one unclaimed chunk is kept; a caller that polls less often than
//!   data arrives loses the earlier chunk.
//! - Device errors during a pass are recorded (see [`SerialHandler::last_error`])
//!   but never trigger a reconnect. Call [`SerialHandler::set_port`] to recover.
//! - `stop()` cannot interrupt a blocking device read or write; size the
//!   connection timeouts accordingly.

use sercom_core::{ConnectionConfig, HandlerConfig, Result, SercomError};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::buffers::TransferBuffers;
use crate::connection::{Connector, SerialConnection, SystemConnector};
use crate::ports;
use crate::worker::IoWorker;

pub(crate) type SharedState = Arc<Mutex<HandlerState>>;

/// Lock the shared state, recovering it if a previous holder panicked
pub(crate) fn lock_state(state: &SharedState) -> MutexGuard<'_, HandlerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the worker and callers share, guarded by one lock
pub(crate) struct HandlerState {
    pub(crate) config: ConnectionConfig,
    pub(crate) connection: Option<Box<dyn SerialConnection>>,
    pub(crate) buffers: TransferBuffers,
    pub(crate) stop_requested: bool,
    pub(crate) last_error: Option<SercomError>,
    worker: WorkerSlot,
}

impl HandlerState {
    pub(crate) fn new(
        config: ConnectionConfig,
        connection: Option<Box<dyn SerialConnection>>,
        buffers: TransferBuffers,
    ) -> Self {
        Self {
            config,
            connection,
            buffers,
            stop_requested: false,
            last_error: None,
            worker: WorkerSlot::Idle,
        }
    }
}

enum WorkerSlot {
    Idle,
    /// Reserved by `start()` while the thread is being spawned
    Starting,
    Running(WorkerHandle),
}

struct WorkerHandle {
    thread: JoinHandle<()>,
    stop_tx: Sender<()>,
}

/// Background serial-port I/O handler
pub struct SerialHandler {
    state: SharedState,
    connector: Arc<dyn Connector>,
    handler_config: HandlerConfig,
}

impl SerialHandler {
    /// Create a handler for the operating system's serial devices.
    ///
    /// If `config.port` is set the port is opened immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::Connection`] if the port cannot be opened.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_connector(config, HandlerConfig::default(), Arc::new(SystemConnector))
    }

    /// Create a handler with explicit worker settings and connection factory
    pub fn with_connector(
        config: ConnectionConfig,
        handler_config: HandlerConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let connection = match config.port {
            Some(ref port) => {
                let connection = connector.open(&config)?;
                info!("Serial handler connected to {}", port);
                Some(connection)
            }
            None => {
                debug!("No port configured; connection deferred until set_port");
                None
            }
        };

        let buffers = TransferBuffers::new(handler_config.inbound);

        Ok(Self {
            state: Arc::new(Mutex::new(HandlerState::new(config, connection, buffers))),
            connector,
            handler_config,
        })
    }

    /// Launch the background worker thread
    pub fn start(&self) -> Result<()> {
        let finished = {
            let mut state = lock_state(&self.state);
            let finished = match std::mem::replace(&mut state.worker, WorkerSlot::Idle) {
                WorkerSlot::Idle => None,
                // A stop that raced the previous start leaves an exited worker behind
                WorkerSlot::Running(handle) if handle.thread.is_finished() => Some(handle),
                other => {
                    state.worker = other;
                    return Err(SercomError::AlreadyRunning);
                }
            };
            state.stop_requested = false;
            state.worker = WorkerSlot::Starting;
            finished
        };

        if let Some(WorkerHandle { thread, .. }) = finished {
            if thread.join().is_err() {
                warn!("Previous I/O worker panicked");
            }
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let worker = IoWorker::new(self.state.clone(), stop_rx, &self.handler_config);
        let spawned = thread::Builder::new()
            .name("sercom-io".to_string())
            .spawn(move || worker.run());

        let mut state = lock_state(&self.state);
        match spawned {
            Ok(thread) => {
                state.worker = WorkerSlot::Running(WorkerHandle { thread, stop_tx });
                Ok(())
            }
            Err(e) => {
                error!("Failed to spawn I/O worker: {}", e);
                state.worker = WorkerSlot::Idle;
                Err(e.into())
            }
        }
    }

    /// Signal the worker to stop and wait for it to exit
    pub fn stop(&self) -> Result<()> {
        let handle = {
            let mut state = lock_state(&self.state);
            state.stop_requested = true;
            match std::mem::replace(&mut state.worker, WorkerSlot::Idle) {
                WorkerSlot::Running(handle) => handle,
                other => {
                    state.worker = other;
                    debug!("stop() called without a running worker");
                    return Ok(());
                }
            }
        };

        let WorkerHandle { thread, stop_tx } = handle;
        drop(stop_tx);
        thread.join().map_err(|_| {
            error!("I/O worker panicked");
            SercomError::WorkerPanicked
        })
    }

    /// Close the current connection (if any) and open `port` with the stored
    /// line settings.
    ///
    /// On failure the handler is left without a connection.
    pub fn set_port(&self, port: impl Into<String>) -> Result<()> {
        let port = port.into();
        let mut state = lock_state(&self.state);

        if let Some(mut old) = state.connection.take() {
            if old.is_open() {
                old.close();
            }
            info!("Closed serial port {}", old.port_name());
        }

        state.config.port = Some(port.clone());
        let connection = self.connector.open(&state.config)?;
        state.connection = Some(connection);
        info!("Serial handler connected to {}", port);
        Ok(())
    }

    /// Queue `data` for transmission by the worker.
    ///
    /// # Errors
    ///
    /// Returns [`SercomError::Encoding`] if `data` is not valid in the
    /// configured encoding; nothing is queued in that case.
    pub fn send_data(&self, data: impl AsRef<[u8]>) -> Result<()> {
        let data = data.as_ref();
        let encoding = self.handler_config.encoding;
        if let Some((offset, byte)) = encoding.first_invalid(data) {
            warn!("Rejected outbound data: byte 0x{:02X} at offset {}", byte, offset);
            return Err(SercomError::Encoding {
                encoding,
                offset,
                byte,
            });
        }

        lock_state(&self.state).buffers.enqueue(data);
        Ok(())
    }

    /// Whether received data is waiting to be claimed
    pub fn is_available(&self) -> bool {
        lock_state(&self.state).buffers.has_inbound()
    }

    /// Take the pending received data; empty when nothing is pending
    pub fn receive_data(&self) -> Vec<u8> {
        lock_state(&self.state).buffers.take_inbound()
    }

    /// Whether a worker thread is starting or running
    pub fn is_running(&self) -> bool {
        match &lock_state(&self.state).worker {
            WorkerSlot::Idle => false,
            WorkerSlot::Starting => true,
            WorkerSlot::Running(handle) => !handle.thread.is_finished(),
        }
    }

    /// Whether a connection handle is present and open
    pub fn is_connected(&self) -> bool {
        lock_state(&self.state)
            .connection
            .as_ref()
            .is_some_and(|c| c.is_open())
    }

    /// Port the handler is configured for
    pub fn port(&self) -> Option<String> {
        lock_state(&self.state).config.port.clone()
    }

    /// Snapshot of the stored connection configuration
    pub fn connection_config(&self) -> ConnectionConfig {
        lock_state(&self.state).config.clone()
    }

    /// Number of bytes queued but not yet written
    pub fn pending_outbound(&self) -> usize {
        lock_state(&self.state).buffers.outbound_len()
    }

    /// Take the most recent device error recorded by the worker
    pub fn last_error(&self) -> Option<SercomError> {
        lock_state(&self.state).last_error.take()
    }

    /// List serial ports on this machine that can be opened
    pub fn available_ports() -> Result<Vec<String>> {
        ports::list_candidate_ports()
    }
}

impl Drop for SerialHandler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop I/O worker on drop: {}", e);
        }
    }
}

impl std::fmt::Debug for SerialHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialHandler")
            .field("port", &self.port())
            .field("handler_config", &self.handler_config)
            .finish()
    }
}
