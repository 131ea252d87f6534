//! Server module for the wspulse latency measurement tool

pub mod config;
pub mod echo;
pub mod monitor;
pub mod push;
pub mod registry;
pub mod service;

pub use config::{ServerConfig, ServerMode};
pub use monitor::{ServerCounters, ServerMonitor};
pub use push::PushEngine;
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use service::Server;
