//! Live connection tracking.

pub mod connection;

pub use connection::{ConnectionHandle, ConnectionRegistry, Outbound};
