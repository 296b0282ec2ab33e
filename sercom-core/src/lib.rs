//! Sercom Core Library
//!
//! Shared types, errors, and configuration for the sercom serial handler.
//! This crate is used by both the hardware crate and the interactive console.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    default_config_path, ConnectionConfig, ConsoleConfig, HandlerConfig, StaticConfig,
};
pub use error::*;
pub use types::*;
