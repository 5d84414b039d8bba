//! Durable chat messages.

pub mod store;

pub use store::MessageStore;
