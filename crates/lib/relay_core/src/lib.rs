//! # relay_core
//!
//! External collaborators for the chat relay.
//!
//! - [`credentials`] — Google access-token resolution (static or metadata server)
//! - [`agent`] — Dialogflow CX session client and fulfillment extraction
//! - [`sentiment`] — Natural Language sentiment client, classification and batch summary

pub mod agent;
pub mod credentials;
pub mod sentiment;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
