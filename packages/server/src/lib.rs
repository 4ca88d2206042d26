//! Reference realtime endpoint for the unihub chat.
//!
//! Layered the same way as a full server: `domain` defines the seams,
//! `infrastructure` implements them, `usecase` holds the chat rules and `ui`
//! exposes them over axum.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
