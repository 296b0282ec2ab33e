//! Configuration types for sercom
//!
//! # Architecture
//!
//! Configuration is split into:
//! - [`ConnectionConfig`] - line settings used to open a serial connection
//! - [`HandlerConfig`] - tuning for the background I/O worker
//! - [`ConsoleConfig`] - settings for the interactive console
//!
//! [`StaticConfig`] bundles all three and is read from a single TOML file.

mod connection;
mod handler;
mod paths;
mod static_config;

pub use connection::ConnectionConfig;
pub use handler::HandlerConfig;
pub use paths::default_config_path;
pub use static_config::{ConsoleConfig, StaticConfig};
