//! Shared building blocks for the unihub realtime client and server.
//!
//! - [`protocol`]: JSON wire contract of the realtime endpoint
//! - [`config`]: environment-driven application configuration
//! - [`time`]: clock abstraction and timestamp helpers
//! - [`logger`]: tracing subscriber setup for the binaries

pub mod config;
pub mod logger;
pub mod protocol;
pub mod time;
