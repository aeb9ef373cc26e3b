//! Request handlers.

pub mod health;
pub mod sentiment;
pub mod webhook;
