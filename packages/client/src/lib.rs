//! Realtime client for the unihub community app.
//!
//! - [`manager`]: owns the single realtime transport and its reconnect policy
//! - [`store`]: application context of observable cells
//! - [`chat`]: chat panel state driven by manager events
//! - [`transport`]: transport abstraction and the WebSocket connector
//! - [`endpoint`]: endpoint resolution and token storage
//! - [`graphql`]: GraphQL request boundary
//! - [`app`], [`runner`]: application shell and terminal front-end

pub mod app;
pub mod chat;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod formatter;
pub mod graphql;
pub mod manager;
pub mod runner;
pub mod store;
pub mod transport;
pub mod ui;
